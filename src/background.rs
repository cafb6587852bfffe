use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::RgbImage;
use rand::Rng;

use crate::error::{SynthError, SynthResult};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Smaller-edge band each background is rescaled into per sample, so glyph
/// sizes stay proportionate across heterogeneous source photos.
const MIN_CANVAS_EDGE: u32 = 480;
const MAX_CANVAS_EDGE: u32 = 640;

/// Ordered pool of background image paths. Jobs pick uniformly with
/// replacement and decode lazily, so the pool itself stays cheap to share.
#[derive(Clone, Debug)]
pub struct BackgroundPool {
    paths: Vec<PathBuf>,
}

impl BackgroundPool {
    pub fn from_dir(dir: &Path) -> SynthResult<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("list backgrounds '{}'", dir.display()))?
        {
            let path = entry.context("read backgrounds entry")?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(SynthError::setup(format!(
                "no background images in '{}'",
                dir.display()
            )));
        }
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn pick(&self, rng: &mut impl Rng) -> &Path {
        &self.paths[rng.gen_range(0..self.paths.len())]
    }

    /// Pick, decode and rescale one background into a sample canvas.
    pub fn load_random(&self, rng: &mut impl Rng) -> SynthResult<RgbImage> {
        let path = self.pick(rng);
        let img = image::open(path)
            .with_context(|| format!("decode background '{}'", path.display()))?
            .to_rgb8();
        let target = rng.gen_range(MIN_CANVAS_EDGE..=MAX_CANVAS_EDGE);
        Ok(resize_to_min_dim(&img, target))
    }
}

/// Scale so the smaller edge equals `min_size`, preserving aspect ratio.
pub fn resize_to_min_dim(img: &RgbImage, min_size: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let scale = f64::from(min_size) / f64::from(w.min(h));
    let nw = ((f64::from(w) * scale).round() as u32).max(1);
    let nh = ((f64::from(h) * scale).round() as u32).max(1);
    image::imageops::resize(img, nw, nh, image::imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    use super::*;

    fn write_png(path: &Path, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, image::Rgb([200, 180, 150]))
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn from_dir_collects_sorted_image_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("b.png"), 4, 4);
        write_png(&dir.path().join("a.png"), 4, 4);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let pool = BackgroundPool::from_dir(dir.path()).unwrap();
        assert_eq!(pool.len(), 2);
        assert!(pool.paths()[0].ends_with("a.png"));
    }

    #[test]
    fn empty_dir_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BackgroundPool::from_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("setup error:"));
    }

    #[test]
    fn resize_scales_smaller_edge_exactly() {
        let img = RgbImage::new(200, 100);
        let out = resize_to_min_dim(&img, 480);
        assert_eq!(out.height(), 480);
        assert_eq!(out.width(), 960);

        let tall = RgbImage::new(100, 300);
        let out = resize_to_min_dim(&tall, 480);
        assert_eq!(out.width(), 480);
        assert_eq!(out.height(), 1440);
    }

    #[test]
    fn load_random_lands_in_the_canvas_band() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("bg.png"), 64, 48);

        let pool = BackgroundPool::from_dir(dir.path()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let canvas = pool.load_random(&mut rng).unwrap();

        let min_edge = canvas.width().min(canvas.height());
        assert!((MIN_CANVAS_EDGE..=MAX_CANVAS_EDGE).contains(&min_edge));
    }

    #[test]
    fn undecodable_background_is_a_job_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let pool = BackgroundPool::from_dir(dir.path()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(pool.load_random(&mut rng).is_err());
    }
}
