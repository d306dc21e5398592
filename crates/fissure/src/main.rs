//! fissure: outline crack-like features in raster images.
//!
//! Three subcommands share one set of detection flags:
//!
//! - `batch` labels every image in a directory into `labeled_images/`
//! - `fetch` downloads one image over HTTP and labels it
//! - `inspect` runs the pipeline on a single file and prints per-stage
//!   diagnostics
//!
//! # Usage
//!
//! ```text
//! fissure batch ./photos --jobs 4
//! fissure fetch https://example.com/wall.jpg --output wall-labeled.jpg
//! fissure inspect ./photos/wall.png --json
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use fissure_io::{BatchConfig, IoError};
use fissure_pipeline::diagnostics::Clock;
use fissure_pipeline::{DetectionConfig, MinLengthScaling, PipelineError, codec};
use log::{LevelFilter, error, info};

/// Highlight crack-like features in images.
///
/// Dark, elongated structures are found with an adaptive threshold,
/// edge detection, and contour tracing; every sufficiently long outline
/// is drawn over the original image.
#[derive(Parser)]
#[command(name = "fissure", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). Overrides the
    /// default level but not module filters given in `RUST_LOG`.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Label every image directly inside a directory.
    Batch {
        /// Directory containing PNG, JPEG, BMP or TIFF images.
        dir: PathBuf,

        /// Name of the output subdirectory.
        #[arg(long, default_value = BatchConfig::DEFAULT_OUTPUT_DIR_NAME)]
        output_dir_name: String,

        /// Process files on this many worker threads.
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        jobs: Option<usize>,

        #[command(flatten)]
        params: Params,
    },

    /// Download an image over HTTP and label it.
    Fetch {
        /// Image URL.
        url: String,

        /// Where to write the labeled image; the extension picks the format.
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        params: Params,
    },

    /// Run the pipeline on one file and print per-stage diagnostics.
    Inspect {
        /// Input image.
        file: PathBuf,

        /// Output diagnostics as JSON instead of a text report.
        #[arg(long)]
        json: bool,

        /// Also write the labeled image here.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        params: Params,
    },
}

/// Detection parameters shared by every subcommand.
#[derive(Args)]
struct Params {
    /// Side of the Gaussian smoothing kernel (odd).
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_BLUR_KERNEL_SIZE)]
    blur_kernel_size: u32,

    /// Adaptive threshold window size (odd, at least 3).
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_THRESHOLD_BLOCK_SIZE)]
    threshold_block_size: u32,

    /// Amount subtracted from the local mean before thresholding.
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_THRESHOLD_OFFSET, allow_negative_numbers = true)]
    threshold_offset: i32,

    /// Side of the closing structuring element (odd).
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_MORPH_KERNEL_SIZE)]
    morph_kernel_size: u32,

    /// Canny low threshold.
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Use the L2 gradient magnitude in edge detection.
    #[arg(long)]
    l2_gradient: bool,

    /// Contours must be longer than this many pixels to be drawn.
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_MIN_ARC_LENGTH)]
    min_arc_length: f64,

    /// Scale the minimum length with the image diagonal.
    #[arg(long)]
    scale_min_length: bool,

    /// Measure contours as closed loops.
    #[arg(long)]
    closed_arc_length: bool,

    /// Outline stroke width in pixels.
    #[arg(long, default_value_t = DetectionConfig::DEFAULT_STROKE_WIDTH)]
    stroke_width: f32,

    /// Full detection config as a JSON object.
    ///
    /// When provided, all other detection flags are ignored. Fields
    /// missing from the object keep their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error parsing --config-json: {0}")]
    ConfigJson(#[source] serde_json::Error),

    #[error("error serializing diagnostics: {0}")]
    Report(#[source] serde_json::Error),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl Params {
    /// Build a [`DetectionConfig`] from the flags or `--config-json`.
    fn to_config(&self) -> Result<DetectionConfig, CliError> {
        if let Some(ref json) = self.config_json {
            return serde_json::from_str(json).map_err(CliError::ConfigJson);
        }

        Ok(DetectionConfig {
            blur_kernel_size: self.blur_kernel_size,
            threshold_block_size: self.threshold_block_size,
            threshold_offset: self.threshold_offset,
            morph_kernel_size: self.morph_kernel_size,
            canny_low: self.canny_low,
            canny_high: self.canny_high,
            l2_gradient: self.l2_gradient,
            min_arc_length: self.min_arc_length,
            min_length_scaling: if self.scale_min_length {
                MinLengthScaling::Diagonal
            } else {
                MinLengthScaling::Fixed
            },
            closed_arc_length: self.closed_arc_length,
            stroke_width: self.stroke_width,
            ..DetectionConfig::default()
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Batch {
            dir,
            output_dir_name,
            jobs,
            params,
        } => {
            let config = BatchConfig {
                output_dir_name,
                detection: params.to_config()?,
                jobs,
                ..BatchConfig::new(dir)
            };
            let report = fissure_io::run_batch(&config)?;
            println!(
                "{} labeled, {} skipped -> {}",
                report.written.len(),
                report.skipped.len(),
                config.output_dir().display()
            );
            Ok(())
        }
        Command::Fetch {
            url,
            output,
            params,
        } => {
            let label = fissure_io::label_remote(&url, &params.to_config()?, &output)?;
            println!(
                "{}x{} image, {} contours -> {}",
                label.dimensions.width,
                label.dimensions.height,
                label.contours,
                label.output.display()
            );
            Ok(())
        }
        Command::Inspect {
            file,
            json,
            output,
            params,
        } => inspect(&file, json, output.as_deref(), &params.to_config()?),
    }
}

fn inspect(
    file: &Path,
    json: bool,
    output: Option<&Path>,
    config: &DetectionConfig,
) -> Result<(), CliError> {
    let bytes = fissure_io::fs::read_bytes(file)?;
    info!("Image: {} ({} bytes)", file.display(), bytes.len());

    let image = codec::decode_color(&bytes)?;
    let (detection, diagnostics) =
        fissure_pipeline::process_with_diagnostics(image, config, &StdClock)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&diagnostics).map_err(CliError::Report)?
        );
    } else {
        println!("{}", diagnostics.report());
    }

    if let Some(path) = output {
        let format = fissure_io::fs::format_for_path(path)?;
        let encoded = codec::encode(&detection.image, format)?;
        fissure_io::fs::write_bytes(path, &encoded)?;
        info!("Labeled image saved as {}", path.display());
    }
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
