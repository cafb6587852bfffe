#![forbid(unsafe_code)]

pub mod atlas;
pub mod augment;
pub mod background;
pub mod composite_cpu;
pub mod config;
pub mod error;
pub mod glyph;
pub mod layout;
pub mod pipeline;
pub mod render;
pub mod vocab;

pub use atlas::GlyphAtlas;
pub use augment::{Augment, BlurAugment};
pub use background::BackgroundPool;
pub use config::{BackendKind, GenerationConfig};
pub use error::{SynthError, SynthResult};
pub use glyph::{FontGlyphSource, GlyphBitmap, GlyphSource};
pub use layout::{Column, Layout, Placement, plan_layout};
pub use pipeline::{RunReport, SampleJob, SharedResources, generate_sample, run_generation};
pub use render::render_layout;
pub use vocab::{Dictionary, Vocabulary};
