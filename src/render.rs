use image::RgbImage;

use crate::composite_cpu::paste_premul_rgba;
use crate::error::SynthResult;
use crate::glyph::GlyphSource;
use crate::layout::Layout;

/// Draw every placement of `layout` onto `canvas` with glyphs from `source`.
///
/// Columns render in the order the layout produced them (right to left), the
/// same order the transcript records. Any glyph lookup failure aborts the
/// sample; rendering a transcript whose image is missing characters would be
/// worse than losing the sample.
pub fn render_layout(
    canvas: &mut RgbImage,
    layout: &Layout,
    source: &dyn GlyphSource,
    size: u32,
) -> SynthResult<()> {
    for column in &layout.columns {
        for p in &column.placements {
            let glyph = source.glyph(p.ch, size)?;
            paste_premul_rgba(canvas, &glyph.image, p.x + glyph.dx, p.y + glyph.dy);
        }
    }
    Ok(())
}
