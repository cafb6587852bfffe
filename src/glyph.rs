use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::composite_cpu::mul_div255;
use crate::error::{SynthError, SynthResult};

/// A rasterized glyph ready to composite.
///
/// `image` is premultiplied RGBA; its alpha channel is the paste mask.
/// `(dx, dy)` offset the bitmap from the layout placement point.
#[derive(Clone, Debug)]
pub struct GlyphBitmap {
    pub image: Arc<image::RgbaImage>,
    pub dx: i32,
    pub dy: i32,
}

/// Capability shared by the two rendering backends: turn a character into a
/// pasteable bitmap.
///
/// A lookup failure is an error, never a silent skip — a dropped glyph would
/// desynchronize the transcript from the rendered image.
pub trait GlyphSource: Send + Sync {
    /// Rasterize `ch` for drawing at `size` pixels.
    fn glyph(&self, ch: char, size: u32) -> SynthResult<GlyphBitmap>;

    /// Characters this source can render.
    fn coverage(&self) -> BTreeSet<char>;

    /// Fixed glyph size, for sources built once at a single row height.
    /// `None` means the caller chooses a size per sample.
    fn fixed_size(&self) -> Option<u32> {
        None
    }
}

/// Draws glyphs straight from a scalable font with a fixed ink color.
#[derive(Debug)]
pub struct FontGlyphSource {
    font: fontdue::Font,
    ink: [u8; 3],
}

impl FontGlyphSource {
    pub fn load(path: &Path) -> SynthResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| SynthError::setup(format!("parse font '{}': {e}", path.display())))?;
        Ok(Self { font, ink: [0, 0, 0] })
    }

    pub fn with_ink(mut self, ink: [u8; 3]) -> Self {
        self.ink = ink;
        self
    }
}

impl GlyphSource for FontGlyphSource {
    fn glyph(&self, ch: char, size: u32) -> SynthResult<GlyphBitmap> {
        if self.font.lookup_glyph_index(ch) == 0 {
            return Err(SynthError::render(format!("font has no glyph for '{ch}'")));
        }

        let (metrics, coverage) = self.font.rasterize(ch, size as f32);
        let (w, h) = (metrics.width as u32, metrics.height as u32);

        let mut rgba = image::RgbaImage::new(w, h);
        for (px, &cov) in rgba.pixels_mut().zip(coverage.iter()) {
            let a = u16::from(cov);
            px.0 = [
                mul_div255(u16::from(self.ink[0]), a),
                mul_div255(u16::from(self.ink[1]), a),
                mul_div255(u16::from(self.ink[2]), a),
                cov,
            ];
        }

        // Seat the glyph in an em cell whose baseline sits at the cell bottom.
        Ok(GlyphBitmap {
            image: Arc::new(rgba),
            dx: metrics.xmin,
            dy: size as i32 - metrics.height as i32 - metrics.ymin,
        })
    }

    fn coverage(&self) -> BTreeSet<char> {
        self.font.chars().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rejects_non_font_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_font.ttf");
        std::fs::write(&path, b"definitely not sfnt data").unwrap();

        let err = FontGlyphSource::load(&path).unwrap_err();
        assert!(err.to_string().contains("setup error:"));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FontGlyphSource::load(&dir.path().join("missing.ttf")).is_err());
    }
}
