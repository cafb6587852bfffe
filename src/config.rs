use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::{SynthError, SynthResult};

/// Which glyph source renders the samples. Chosen once per run, not per sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Rasterize glyphs directly from the font at a per-sample random size.
    #[default]
    Font,
    /// Composite pre-rasterized bitmaps from an SVG glyph atlas at a fixed row height.
    Atlas,
}

/// Run parameters for one generation run.
///
/// Loaded from JSON by the CLI; every knob with a sensible fixed default is
/// `#[serde(default)]` so a minimal config only names the inputs and the
/// sample count.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GenerationConfig {
    /// Font file; its character map always participates in the vocabulary
    /// intersection, for both backends.
    pub font: PathBuf,
    /// JSON object of key -> single-character dictionary entries.
    pub dictionary: PathBuf,
    /// Directory of background images.
    pub backgrounds: PathBuf,
    /// Output directory for images (and transcripts unless `text_dir` is set).
    pub image_dir: PathBuf,
    #[serde(default)]
    pub text_dir: Option<PathBuf>,

    pub sample_count: u64,

    #[serde(default)]
    pub backend: BackendKind,
    /// Directory of per-character `<key>.svg` glyph files (atlas backend only).
    #[serde(default)]
    pub atlas_dir: Option<PathBuf>,
    #[serde(default = "default_row_height")]
    pub atlas_row_height: u32,

    /// Worker pool size; defaults to available parallelism, always capped by
    /// `worker_cap`.
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_worker_cap")]
    pub worker_cap: usize,

    #[serde(default = "default_augment_probability")]
    pub augment_probability: f64,
}

fn default_row_height() -> u32 {
    32
}

fn default_worker_cap() -> usize {
    4
}

fn default_augment_probability() -> f64 {
    0.5
}

impl GenerationConfig {
    pub fn validate(&self) -> SynthResult<()> {
        if self.sample_count == 0 {
            return Err(SynthError::setup("sample_count must be > 0"));
        }
        if self.worker_cap == 0 {
            return Err(SynthError::setup("worker_cap must be > 0"));
        }
        if let Some(w) = self.workers
            && w == 0
        {
            return Err(SynthError::setup("workers must be >= 1 when set"));
        }
        if !(0.0..=1.0).contains(&self.augment_probability) {
            return Err(SynthError::setup("augment_probability must be in [0, 1]"));
        }
        if self.backend == BackendKind::Atlas {
            if self.atlas_dir.is_none() {
                return Err(SynthError::setup("atlas backend requires atlas_dir"));
            }
            if self.atlas_row_height == 0 {
                return Err(SynthError::setup("atlas_row_height must be > 0"));
            }
        }
        Ok(())
    }

    /// Transcript directory; the image directory doubles as the text
    /// directory when none is configured.
    pub fn text_output_dir(&self) -> &Path {
        self.text_dir.as_deref().unwrap_or(&self.image_dir)
    }

    /// Effective worker pool size. Bounded by `worker_cap` because every
    /// worker duplicates font rasterization state and atlas references.
    pub fn worker_count(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        self.workers.unwrap_or(available).min(self.worker_cap).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_config() -> GenerationConfig {
        GenerationConfig {
            font: PathBuf::from("font.ttf"),
            dictionary: PathBuf::from("meta.json"),
            backgrounds: PathBuf::from("backgrounds"),
            image_dir: PathBuf::from("out"),
            text_dir: None,
            sample_count: 10,
            backend: BackendKind::Font,
            atlas_dir: None,
            atlas_row_height: 32,
            workers: None,
            worker_cap: 4,
            augment_probability: 0.5,
        }
    }

    #[test]
    fn json_roundtrip_with_defaults() {
        let json = r#"{
            "font": "font.ttf",
            "dictionary": "meta.json",
            "backgrounds": "backgrounds",
            "image_dir": "out",
            "sample_count": 3
        }"#;
        let cfg: GenerationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.backend, BackendKind::Font);
        assert_eq!(cfg.atlas_row_height, 32);
        assert_eq!(cfg.worker_cap, 4);
        assert_eq!(cfg.augment_probability, 0.5);
        cfg.validate().unwrap();

        let s = serde_json::to_string(&cfg).unwrap();
        let de: GenerationConfig = serde_json::from_str(&s).unwrap();
        assert_eq!(de.sample_count, 3);
    }

    #[test]
    fn text_dir_defaults_to_image_dir() {
        let cfg = basic_config();
        assert_eq!(cfg.text_output_dir(), Path::new("out"));

        let mut cfg = basic_config();
        cfg.text_dir = Some(PathBuf::from("labels"));
        assert_eq!(cfg.text_output_dir(), Path::new("labels"));
    }

    #[test]
    fn validate_rejects_zero_samples() {
        let mut cfg = basic_config();
        cfg.sample_count = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_atlas_without_dir() {
        let mut cfg = basic_config();
        cfg.backend = BackendKind::Atlas;
        assert!(cfg.validate().is_err());

        cfg.atlas_dir = Some(PathBuf::from("glyphs"));
        cfg.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_probability() {
        let mut cfg = basic_config();
        cfg.augment_probability = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn worker_count_respects_cap_and_override() {
        let mut cfg = basic_config();
        cfg.worker_cap = 2;
        assert!(cfg.worker_count() <= 2);

        cfg.workers = Some(1);
        assert_eq!(cfg.worker_count(), 1);
    }
}
