use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context as _;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng as _};
use rayon::prelude::*;

use crate::atlas::GlyphAtlas;
use crate::augment::{Augment, BlurAugment};
use crate::background::BackgroundPool;
use crate::config::{BackendKind, GenerationConfig};
use crate::error::{SynthError, SynthResult};
use crate::glyph::{FontGlyphSource, GlyphSource};
use crate::layout::plan_layout;
use crate::render::render_layout;
use crate::vocab::{Dictionary, Vocabulary};

/// Direct-font backend: per-sample glyph size band as fractions of the
/// smaller canvas edge.
const FONT_SIZE_DIVISOR_MAX: u32 = 20;
const FONT_SIZE_DIVISOR_MIN: u32 = 10;

/// Read-only inputs shared by every job in one generation run.
///
/// Built once, then handed to the worker pool by reference; no job mutates
/// any of it, so no locking is involved.
pub struct SharedResources {
    pub vocabulary: Vocabulary,
    pub backgrounds: BackgroundPool,
    pub glyphs: Arc<dyn GlyphSource>,
    pub augment: Option<Arc<dyn Augment>>,
    pub augment_probability: f64,
}

impl std::fmt::Debug for SharedResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedResources")
            .field("vocabulary", &self.vocabulary)
            .field("backgrounds", &self.backgrounds)
            .field("augment_probability", &self.augment_probability)
            .finish_non_exhaustive()
    }
}

impl SharedResources {
    /// Load and intersect everything up front. Any failure here is a setup
    /// error and no job may be dispatched.
    pub fn prepare(cfg: &GenerationConfig) -> SynthResult<Self> {
        cfg.validate()?;

        let dictionary = Dictionary::load(&cfg.dictionary)?;
        let backgrounds = BackgroundPool::from_dir(&cfg.backgrounds)?;
        let font = FontGlyphSource::load(&cfg.font)?;
        let vocabulary = Vocabulary::resolve(&font.coverage(), &dictionary)?;

        let (vocabulary, glyphs): (Vocabulary, Arc<dyn GlyphSource>) = match cfg.backend {
            BackendKind::Font => (vocabulary, Arc::new(font)),
            BackendKind::Atlas => {
                let atlas_dir = cfg
                    .atlas_dir
                    .as_ref()
                    .ok_or_else(|| SynthError::setup("atlas backend requires atlas_dir"))?;
                let atlas = GlyphAtlas::build(atlas_dir, &dictionary, cfg.atlas_row_height)?;
                let vocabulary = vocabulary.restrict_to(&atlas.coverage())?;
                (vocabulary, Arc::new(atlas))
            }
        };

        tracing::info!(
            vocabulary = vocabulary.len(),
            backgrounds = backgrounds.len(),
            backend = ?cfg.backend,
            "shared resources prepared"
        );

        Ok(Self {
            vocabulary,
            backgrounds,
            glyphs,
            augment: Some(Arc::new(BlurAugment::default())),
            augment_probability: cfg.augment_probability,
        })
    }

    pub fn with_augment(mut self, augment: Option<Arc<dyn Augment>>) -> Self {
        self.augment = augment;
        self
    }
}

/// The atomic unit of work: one sample index plus the shared inputs.
pub struct SampleJob<'a> {
    pub index: u64,
    pub resources: &'a SharedResources,
    pub image_dir: &'a Path,
    pub text_dir: &'a Path,
}

impl SampleJob<'_> {
    pub fn image_path(&self) -> std::path::PathBuf {
        self.image_dir.join(format!("image_{:04}.jpg", self.index))
    }

    pub fn text_path(&self) -> std::path::PathBuf {
        self.text_dir.join(format!("image_{:04}.txt", self.index))
    }
}

/// Produce one (image, transcript) artifact pair.
///
/// Each job draws its own random sequence; no determinism is promised across
/// jobs, but the layout is fully determined by this job's draws.
pub fn generate_sample(job: &SampleJob<'_>) -> SynthResult<()> {
    let res = job.resources;
    let mut rng = SmallRng::from_entropy();

    let mut canvas = res.backgrounds.load_random(&mut rng)?;
    let (width, height) = canvas.dimensions();
    let min_dim = width.min(height);

    let size = match res.glyphs.fixed_size() {
        Some(s) => s,
        None => rng.gen_range(
            (min_dim / FONT_SIZE_DIVISOR_MAX).max(1)..=(min_dim / FONT_SIZE_DIVISOR_MIN).max(2),
        ),
    };

    let layout = plan_layout(width, height, size, &res.vocabulary, &mut rng);
    render_layout(&mut canvas, &layout, res.glyphs.as_ref(), size)?;

    if let Some(augment) = &res.augment
        && rng.gen_bool(res.augment_probability.clamp(0.0, 1.0))
    {
        canvas = augment.apply(canvas)?;
    }

    let image_path = job.image_path();
    canvas
        .save_with_format(&image_path, image::ImageFormat::Jpeg)
        .with_context(|| format!("write image '{}'", image_path.display()))?;

    let text_path = job.text_path();
    std::fs::write(&text_path, layout.transcript())
        .with_context(|| format!("write transcript '{}'", text_path.display()))?;

    Ok(())
}

/// Outcome of one generation run: which indices produced artifacts and which
/// failed, with the failure messages.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub total: u64,
    pub succeeded: Vec<u64>,
    pub failed: Vec<(u64, String)>,
}

impl RunReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.succeeded.len() as u64 == self.total
    }
}

/// Fan the job list out across a bounded worker pool and collect unordered
/// completions.
///
/// Per-job failures are isolated: they are logged, recorded in the report and
/// never crash sibling jobs. Only setup problems (bad config, pool
/// construction) abort the run itself.
pub fn run_generation(cfg: &GenerationConfig, resources: &SharedResources) -> SynthResult<RunReport> {
    cfg.validate()?;

    std::fs::create_dir_all(&cfg.image_dir)
        .with_context(|| format!("create image dir '{}'", cfg.image_dir.display()))?;
    let text_dir = cfg.text_output_dir();
    std::fs::create_dir_all(text_dir)
        .with_context(|| format!("create text dir '{}'", text_dir.display()))?;

    let workers = cfg.worker_count();
    let pool = build_worker_pool(workers)?;
    tracing::info!(samples = cfg.sample_count, workers, "starting generation");

    let completed = AtomicU64::new(0);
    let total = cfg.sample_count;
    let results: Vec<(u64, SynthResult<()>)> = pool.install(|| {
        (0..total)
            .into_par_iter()
            .map(|index| {
                let job = SampleJob {
                    index,
                    resources,
                    image_dir: &cfg.image_dir,
                    text_dir,
                };
                let result = generate_sample(&job);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(index, done, total, "sample finished");
                (index, result)
            })
            .collect()
    });

    let mut report = RunReport { total, ..RunReport::default() };
    for (index, result) in results {
        match result {
            Ok(()) => report.succeeded.push(index),
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(index, error = %message, "sample failed");
                report.failed.push((index, message));
            }
        }
    }

    tracing::info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "generation finished"
    );
    Ok(report)
}

fn build_worker_pool(threads: usize) -> SynthResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SynthError::setup(format!("failed to build worker pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_report_accounting() {
        let mut report = RunReport { total: 3, ..RunReport::default() };
        report.succeeded.extend([0, 2]);
        report.failed.push((1, "render error: boom".to_string()));
        assert!(!report.all_succeeded());

        report.succeeded.push(1);
        report.failed.clear();
        assert!(report.all_succeeded());
    }

    #[test]
    fn job_paths_use_zero_padded_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bg.png"),
            {
                let mut buf = Vec::new();
                image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0]))
                    .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
                    .unwrap();
                buf
            },
        )
        .unwrap();

        let coverage = std::collections::BTreeSet::from(['一']);
        let dictionary = Dictionary::from_entries([("k1".to_string(), "一".to_string())]);
        let resources = SharedResources {
            vocabulary: Vocabulary::resolve(&coverage, &dictionary).unwrap(),
            backgrounds: BackgroundPool::from_dir(dir.path()).unwrap(),
            glyphs: Arc::new(NullSource),
            augment: None,
            augment_probability: 0.0,
        };

        let job = SampleJob {
            index: 7,
            resources: &resources,
            image_dir: Path::new("out"),
            text_dir: Path::new("labels"),
        };
        assert_eq!(job.image_path(), Path::new("out/image_0007.jpg"));
        assert_eq!(job.text_path(), Path::new("labels/image_0007.txt"));
    }

    struct NullSource;

    impl GlyphSource for NullSource {
        fn glyph(&self, ch: char, _size: u32) -> SynthResult<crate::glyph::GlyphBitmap> {
            Err(SynthError::render(format!("no glyph for '{ch}'")))
        }

        fn coverage(&self) -> std::collections::BTreeSet<char> {
            std::collections::BTreeSet::new()
        }
    }
}
