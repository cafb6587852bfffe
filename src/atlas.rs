use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use rayon::prelude::*;

use crate::error::{SynthError, SynthResult};
use crate::glyph::{GlyphBitmap, GlyphSource};
use crate::vocab::Dictionary;

/// Pre-rasterized glyph bitmaps keyed by character, all at one row height.
///
/// Built once from a directory of `<key>.svg` files before any sample job
/// starts; keys are resolved to characters through the dictionary. Bitmaps
/// are premultiplied RGBA; height is exactly `row_height` and width varies
/// per character, preserving the source aspect ratio.
#[derive(Debug)]
pub struct GlyphAtlas {
    glyphs: BTreeMap<char, Arc<image::RgbaImage>>,
    row_height: u32,
}

impl GlyphAtlas {
    pub fn build(dir: &Path, dictionary: &Dictionary, row_height: u32) -> SynthResult<Self> {
        if row_height == 0 {
            return Err(SynthError::setup("atlas row height must be > 0"));
        }

        let mut files: Vec<(char, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("list atlas glyph dir '{}'", dir.display()))?
        {
            let path = entry.context("read atlas dir entry")?.path();
            if !path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
            {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(ch) = dictionary.char_for_key(stem) {
                files.push((ch, path));
            }
        }
        files.sort();

        let rasterized: Vec<(char, PathBuf, SynthResult<image::RgbaImage>)> = files
            .into_par_iter()
            .map(|(ch, path)| {
                let result = rasterize_glyph_file(&path, row_height);
                (ch, path, result)
            })
            .collect();

        let mut glyphs = BTreeMap::new();
        for (ch, path, result) in rasterized {
            match result {
                Ok(img) => {
                    glyphs.insert(ch, Arc::new(img));
                }
                Err(err) => {
                    tracing::warn!(
                        glyph = %ch,
                        file = %path.display(),
                        error = %err,
                        "skipping glyph file that failed to rasterize"
                    );
                }
            }
        }

        if glyphs.is_empty() {
            return Err(SynthError::setup(format!(
                "atlas build produced no glyphs from '{}'",
                dir.display()
            )));
        }

        tracing::info!(glyphs = glyphs.len(), row_height, "glyph atlas built");
        Ok(Self { glyphs, row_height })
    }

    pub fn row_height(&self) -> u32 {
        self.row_height
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn get(&self, ch: char) -> Option<&Arc<image::RgbaImage>> {
        self.glyphs.get(&ch)
    }
}

impl GlyphSource for GlyphAtlas {
    fn glyph(&self, ch: char, _size: u32) -> SynthResult<GlyphBitmap> {
        let image = self
            .glyphs
            .get(&ch)
            .cloned()
            .ok_or_else(|| SynthError::render(format!("atlas has no glyph for '{ch}'")))?;
        Ok(GlyphBitmap { image, dx: 0, dy: 0 })
    }

    fn coverage(&self) -> BTreeSet<char> {
        self.glyphs.keys().copied().collect()
    }

    fn fixed_size(&self) -> Option<u32> {
        Some(self.row_height)
    }
}

/// Parse one SVG glyph file and rasterize it at `row_height`, scaling width
/// to preserve the aspect ratio. Returns premultiplied RGBA.
fn rasterize_glyph_file(path: &Path, row_height: u32) -> SynthResult<image::RgbaImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read glyph svg '{}'", path.display()))?;
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(&bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    let scale = row_height as f32 / size.height();
    let width = ((size.width() * scale).ceil() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, row_height)
        .ok_or_else(|| SynthError::setup("failed to allocate glyph pixmap"))?;
    let sx = width as f32 / size.width();
    let sy = row_height as f32 / size.height();
    let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    image::RgbaImage::from_raw(width, row_height, pixmap.take())
        .ok_or_else(|| SynthError::setup("glyph pixmap buffer size mismatch"))
}
