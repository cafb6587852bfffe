use image::{RgbImage, RgbaImage};

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over of a premultiplied RGBA pixel onto an opaque RGB pixel.
pub fn over_rgb(dst: [u8; 3], src: PremulRgba8) -> [u8; 3] {
    let a = u16::from(src[3]);
    if a == 0 {
        return dst;
    }
    let inv = 255u16 - a;

    let mut out = [0u8; 3];
    for i in 0..3 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Paste a premultiplied RGBA bitmap onto an RGB canvas at `(left, top)`,
/// clipping whatever falls outside the canvas. Negative offsets are valid.
pub fn paste_premul_rgba(dst: &mut RgbImage, src: &RgbaImage, left: i32, top: i32) {
    let (dw, dh) = dst.dimensions();
    for (sx, sy, px) in src.enumerate_pixels() {
        let x = left + sx as i32;
        let y = top + sy as i32;
        if x < 0 || y < 0 || x as u32 >= dw || y as u32 >= dh {
            continue;
        }
        let d = dst.get_pixel_mut(x as u32, y as u32);
        d.0 = over_rgb(d.0, px.0);
    }
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30];
        let src = [255, 255, 255, 0];
        assert_eq!(over_rgb(dst, src), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0];
        let src = [255, 0, 0, 255];
        assert_eq!(over_rgb(dst, src), [255, 0, 0]);
    }

    #[test]
    fn over_half_alpha_blends() {
        // Premultiplied half-opaque black over white.
        let dst = [255, 255, 255];
        let src = [0, 0, 0, 128];
        let out = over_rgb(dst, src);
        for c in out {
            assert!((i32::from(c) - 127).abs() <= 1);
        }
    }

    #[test]
    fn paste_clips_at_edges() {
        let mut canvas = RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]));
        let glyph = RgbaImage::from_pixel(3, 3, image::Rgba([255, 255, 255, 255]));

        paste_premul_rgba(&mut canvas, &glyph, 2, -1);

        assert_eq!(canvas.get_pixel(2, 0).0, [255, 255, 255]);
        assert_eq!(canvas.get_pixel(3, 1).0, [255, 255, 255]);
        // Outside the pasted region stays untouched.
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(canvas.get_pixel(2, 3).0, [0, 0, 0]);
    }

    #[test]
    fn paste_fully_offscreen_is_noop() {
        let mut canvas = RgbImage::from_pixel(2, 2, image::Rgb([7, 7, 7]));
        let glyph = RgbaImage::from_pixel(2, 2, image::Rgba([255, 255, 255, 255]));
        paste_premul_rgba(&mut canvas, &glyph, -5, 10);
        for px in canvas.pixels() {
            assert_eq!(px.0, [7, 7, 7]);
        }
    }
}
