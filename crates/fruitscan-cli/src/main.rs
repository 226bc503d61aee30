//! fruitscan CLI — command-line interface for fruit detection and counting.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use fruitscan_core::{AccuracyTier, FruitDetector, FruitKind, ProfileSet};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "fruitscan")]
#[command(about = "Detect and count fruit in orchard photos (color/shape pipeline, no ML)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and count fruit in an image.
    Detect(CliDetectArgs),

    /// Learn a count-correction factor from a reference photo.
    Calibrate(CliCalibrateArgs),

    /// Print the built-in fruit profiles as JSON.
    Profiles,
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Path to the input image.
    image: PathBuf,

    /// Fruit category to look for.
    #[arg(long, value_enum, default_value_t = FruitArg::Apple)]
    fruit: FruitArg,

    /// Accuracy tier.
    #[arg(long, value_enum, default_value_t = TierArg::Medium)]
    tier: TierArg,

    /// Path to write the detection report (JSON); stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Reference photo to calibrate on before detecting.
    #[arg(long)]
    calibrate_with: Option<PathBuf>,

    /// Known fruit count in the reference photo.
    #[arg(long)]
    expected: Option<u32>,
}

#[derive(Debug, Clone, Args)]
struct CliCalibrateArgs {
    /// Path to the reference image.
    image: PathBuf,

    /// Fruit category in the reference image.
    #[arg(long, value_enum, default_value_t = FruitArg::Apple)]
    fruit: FruitArg,

    /// Known fruit count in the reference image.
    #[arg(long)]
    expected: u32,

    /// Accuracy tier.
    #[arg(long, value_enum, default_value_t = TierArg::Medium)]
    tier: TierArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FruitArg {
    Apple,
    Pear,
    Cherry,
    Plum,
}

impl FruitArg {
    fn to_core(self) -> FruitKind {
        match self {
            Self::Apple => FruitKind::Apple,
            Self::Pear => FruitKind::Pear,
            Self::Cherry => FruitKind::Cherry,
            Self::Plum => FruitKind::Plum,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    Low,
    Medium,
    High,
}

impl TierArg {
    fn to_core(self) -> AccuracyTier {
        match self {
            Self::Low => AccuracyTier::Low,
            Self::Medium => AccuracyTier::Medium,
            Self::High => AccuracyTier::High,
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::Profiles => run_profiles(),
    }
}

fn load_rgb(path: &Path) -> CliResult<image::RgbImage> {
    let img = image::open(path)
        .map_err(|e| -> CliError { format!("Failed to open image {}: {}", path.display(), e).into() })?;
    Ok(img.to_rgb8())
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let rgb = load_rgb(&args.image)?;
    let (w, h) = rgb.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let engine = FruitDetector::new(args.tier.to_core());
    let kind = args.fruit.to_core();

    if let Some(reference) = &args.calibrate_with {
        let expected = args
            .expected
            .ok_or("--calibrate-with requires --expected")?;
        let factor = engine.calibrate_image(&load_rgb(reference)?, expected, kind);
        tracing::info!("Calibration factor: {:.3}", factor);
    }

    let report = engine.detect_image(&rgb, kind);
    tracing::info!(
        "Detected {} {} at {:.2} confidence",
        report.total_count,
        kind.name(),
        report.confidence
    );

    let json = serde_json::to_string_pretty(&report)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

// ── calibrate ──────────────────────────────────────────────────────────

fn run_calibrate(args: &CliCalibrateArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let rgb = load_rgb(&args.image)?;

    let engine = FruitDetector::new(args.tier.to_core());
    let kind = args.fruit.to_core();
    let factor = engine.calibrate_image(&rgb, args.expected, kind);

    println!("fruit:    {}", kind.name());
    println!("expected: {}", args.expected);
    println!("factor:   {:.4}", factor);

    Ok(())
}

// ── profiles ───────────────────────────────────────────────────────────

fn run_profiles() -> CliResult<()> {
    let profiles = ProfileSet::default();
    println!("{}", serde_json::to_string_pretty(&profiles)?);
    Ok(())
}
