use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use nomsynth::{BackendKind, GenerationConfig, SharedResources, run_generation};

#[derive(Parser, Debug)]
#[command(name = "nomsynth", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dataset of (image, transcript) sample pairs.
    Generate(GenerateArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Generation config JSON.
    #[arg(long = "config")]
    config_path: PathBuf,

    /// Override the configured sample count.
    #[arg(long)]
    count: Option<u64>,

    /// Override the configured image output directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Override the configured rendering backend.
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Font,
    Atlas,
}

impl From<BackendChoice> for BackendKind {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Font => Self::Font,
            BackendChoice::Atlas => Self::Atlas,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
    }
}

fn read_config(path: &std::path::Path) -> anyhow::Result<GenerationConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let cfg: GenerationConfig =
        serde_json::from_reader(BufReader::new(f)).context("parse config JSON")?;
    Ok(cfg)
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let mut cfg = read_config(&args.config_path)?;
    if let Some(count) = args.count {
        cfg.sample_count = count;
    }
    if let Some(out) = args.out {
        cfg.image_dir = out;
    }
    if let Some(backend) = args.backend {
        cfg.backend = backend.into();
    }
    cfg.validate()?;

    let resources = SharedResources::prepare(&cfg)?;
    let report = run_generation(&cfg, &resources)?;

    eprintln!(
        "generated {}/{} samples into {}",
        report.succeeded.len(),
        report.total,
        cfg.image_dir.display()
    );
    if !report.failed.is_empty() {
        for (index, message) in &report.failed {
            eprintln!("  sample {index} failed: {message}");
        }
        anyhow::bail!("{} of {} samples failed", report.failed.len(), report.total);
    }
    Ok(())
}
