use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use image::io::Reader as ImageReader;
use image::GenericImageView;
use log::{info, LevelFilter};
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use serde::Serialize;

use image_signature::{
    distance, generate_from_image, Signature, SignatureConfig, NEAR_DUPLICATE_THRESHOLD,
};

/// Perceptual image signatures for near-duplicate detection
#[derive(Parser, Debug)]
#[command(name = "image-signature", version, about)]
#[command(after_help = "EXIT CODES:
    0 - Success
    1 - Distance exceeded --max-distance
    2 - Error (file not found, invalid image, etc.)")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the signature of an image as JSON
    Sign {
        image: PathBuf,

        #[command(flatten)]
        tuning: Tuning,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Print the distance between two images or saved signatures (*.json)
    Compare {
        first: PathBuf,
        second: PathBuf,

        #[command(flatten)]
        tuning: Tuning,

        /// Distance below which the pair counts as near-duplicate
        #[arg(long, default_value_t = NEAR_DUPLICATE_THRESHOLD)]
        threshold: f64,

        /// Exit with code 1 if the distance is above this value
        #[arg(long, value_name = "DISTANCE")]
        max_distance: Option<f64>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct Tuning {
    /// JSON file with a signature configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Lower crop percentile
    #[arg(long)]
    lower: Option<f64>,

    /// Upper crop percentile
    #[arg(long)]
    upper: Option<f64>,

    /// Sample points per axis
    #[arg(long)]
    grid_size: Option<usize>,

    /// Neighbor differences up to this magnitude count as identical
    #[arg(long, value_name = "TOLERANCE")]
    identical_tolerance: Option<f64>,
}

impl Tuning {
    fn resolve(&self) -> Result<SignatureConfig> {
        let mut config: SignatureConfig = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open '{}'", path.display()))?;
                serde_json::from_reader(file)
                    .with_context(|| format!("failed to parse '{}'", path.display()))?
            }
            None => SignatureConfig::default(),
        };
        if let Some(lower) = self.lower {
            config.lower_percentile = lower;
        }
        if let Some(upper) = self.upper {
            config.upper_percentile = upper;
        }
        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(tolerance) = self.identical_tolerance {
            config.identical_tolerance = tolerance;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Serialize)]
struct CompareOutput<'a> {
    first: &'a Path,
    second: &'a Path,
    distance: f64,
    threshold: f64,
    near_duplicate: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_log(cli.verbose) {
        eprintln!("error: {:#}", e);
        return ExitCode::from(2);
    }

    match run(&cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_log(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} {t} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn run(command: &Command) -> Result<ExitCode> {
    match command {
        Command::Sign {
            image,
            tuning,
            pretty,
        } => {
            let signature = sign(image, &tuning.resolve()?)?;
            let json = match *pretty {
                true => serde_json::to_string_pretty(&signature)?,
                false => serde_json::to_string(&signature)?,
            };
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Command::Compare {
            first,
            second,
            tuning,
            threshold,
            max_distance,
            json,
        } => {
            let config = tuning.resolve()?;
            let d = distance(&load(first, &config)?, &load(second, &config)?)
                .context("signatures are not comparable")?;
            let output = CompareOutput {
                first,
                second,
                distance: d,
                threshold: *threshold,
                near_duplicate: d < *threshold,
            };
            match *json {
                true => println!("{}", serde_json::to_string_pretty(&output)?),
                false => println!(
                    "{:.6}\t{}",
                    d,
                    match output.near_duplicate {
                        true => "near-duplicate",
                        false => "different",
                    }
                ),
            }
            match max_distance {
                Some(max) if d > *max => Ok(ExitCode::from(1)),
                _ => Ok(ExitCode::SUCCESS),
            }
        }
    }
}

fn sign(path: &Path, config: &SignatureConfig) -> Result<Signature> {
    let image = ImageReader::open(path)
        .with_context(|| format!("failed to open '{}'", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("failed to decode '{}'", path.display()))?;
    info!(
        "decoded '{}' ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    generate_from_image(&image, config)
        .with_context(|| format!("failed to sign '{}'", path.display()))
}

/// Signs an image, or reads a signature previously written by `sign`.
fn load(path: &Path, config: &SignatureConfig) -> Result<Signature> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("json"));
    match is_json {
        true => {
            let file = File::open(path)
                .with_context(|| format!("failed to open '{}'", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("failed to parse signature '{}'", path.display()))
        }
        false => sign(path, config),
    }
}
