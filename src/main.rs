//! Badge Scanner - command line front end
//!
//! Runs the badge pipeline on image files and text, for checking templates
//! and settings without the capture app.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use badge_scanner::analysis::{find_existing, parse};
use badge_scanner::capture::load_image;
use badge_scanner::config::{self, ScannerConfig};
use badge_scanner::shared::Attendee;
use badge_scanner::storage::{load_attendees, load_template};
use badge_scanner::vision::{platform_recognizer, GeometryCorrector, HoughQuadDetector, ImageEnhancer};
use badge_scanner::BadgeScanner;

/// Badge Scanner - conference badge text extraction
#[derive(Parser, Debug)]
#[command(name = "badge-scanner")]
#[command(about = "Extract attendee details from conference badge photos")]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Correct and enhance a badge photo and write the result
    Preprocess {
        input: PathBuf,
        output: PathBuf,
        /// Longer side limit in pixels
        #[arg(long)]
        max_dimension: Option<u32>,
        /// Skip badge outline detection and dewarping
        #[arg(long)]
        no_perspective: bool,
        /// Skip auto-contrast and auto-exposure
        #[arg(long)]
        no_enhance: bool,
    },
    /// Parse badge text (stdin when no file is given) into attendee fields
    Parse { file: Option<PathBuf> },
    /// Scan a badge photo with the platform text recognizer
    Scan {
        image: PathBuf,
        /// Badge template JSON with field regions
        #[arg(long)]
        template: Option<PathBuf>,
        /// Attendee list JSON to match against
        #[arg(long)]
        attendees: Option<PathBuf>,
    },
    /// Look up an attendee by email or phone
    Dedupe {
        #[arg(long)]
        attendees: PathBuf,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_scanner_config(args.config.as_deref())?;

    match args.command {
        Command::Preprocess {
            input,
            output,
            max_dimension,
            no_perspective,
            no_enhance,
        } => {
            let mut config = config;
            if let Some(max_dimension) = max_dimension {
                config.preprocessing.max_dimension = max_dimension;
            }
            config.preprocessing.perspective_correction &= !no_perspective;
            config.preprocessing.enhance &= !no_enhance;
            run_preprocess(&config.sanitized(), &input, &output)
        }
        Command::Parse { file } => run_parse(file.as_deref()),
        Command::Scan {
            image,
            template,
            attendees,
        } => run_scan(config, &image, template.as_deref(), attendees.as_deref()).await,
        Command::Dedupe {
            attendees,
            email,
            phone,
        } => run_dedupe(&attendees, email.as_deref(), phone.as_deref()),
    }
}

/// Load configuration from the given file or the default location
fn load_scanner_config(path: Option<&Path>) -> Result<ScannerConfig> {
    match path {
        Some(path) => config::load_config(path),
        None => match config::default_config_path() {
            Ok(path) => config::load_or_default(&path),
            Err(e) => {
                info!("Using default configuration ({})", e);
                Ok(ScannerConfig::default())
            }
        },
    }
}

fn run_preprocess(config: &ScannerConfig, input: &Path, output: &Path) -> Result<()> {
    let captured = load_image(input).with_context(|| format!("Failed to load {}", input.display()))?;

    let corrector = GeometryCorrector::new(config.geometry_settings(), Arc::new(HoughQuadDetector::default()));
    let (corrected, warped) = corrector.correct_detailed(&captured);
    let enhanced = ImageEnhancer::new(config.enhance_settings()).enhance(&corrected);

    enhanced
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "Wrote {}x{} image to {} (perspective corrected: {})",
        enhanced.width(),
        enhanced.height(),
        output.display(),
        warped
    );
    Ok(())
}

fn run_parse(file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
            text
        }
    };

    println!("{}", serde_json::to_string_pretty(&parse(&text))?);
    Ok(())
}

async fn run_scan(config: ScannerConfig, image: &Path, template: Option<&Path>, attendees: Option<&Path>) -> Result<()> {
    let recognizer = platform_recognizer(&config.recognition_options())
        .context("No text recognizer is available on this platform")?;

    let captured = load_image(image).with_context(|| format!("Failed to load {}", image.display()))?;
    let template = template.map(load_template).transpose()?;
    let candidates: Vec<Attendee> = attendees.map(load_attendees).transpose()?.unwrap_or_default();

    let scanner = BadgeScanner::new(config, recognizer);
    let extraction = scanner.scan(&captured, template.as_ref()).await?;

    println!("{}", serde_json::to_string_pretty(&extraction)?);
    println!("{}", serde_json::to_string_pretty(&extraction.attendee_fields())?);

    match scanner.find_existing(&extraction, &candidates) {
        Some(existing) => println!("Existing attendee: {}", serde_json::to_string(existing)?),
        None => println!("New attendee"),
    }
    Ok(())
}

fn run_dedupe(attendees: &Path, email: Option<&str>, phone: Option<&str>) -> Result<()> {
    let candidates = load_attendees(attendees)?;

    match find_existing(email, phone, &candidates) {
        Some(existing) => println!("{}", serde_json::to_string_pretty(existing)?),
        None => println!("No match"),
    }
    Ok(())
}
