//! Directory batch labeling.
//!
//! Every supported image directly inside a source directory is run
//! through the detection pipeline and written under the same file name
//! to an output subdirectory (`labeled_images` by default), encoded in
//! the format its extension names. Files that cannot be read or do not
//! decode are logged and skipped; every other failure stops the batch.

use std::path::{Path, PathBuf};

use fissure_pipeline::{DetectionConfig, codec};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{IoError, decode_error};
use crate::fs;

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory whose images are labeled.
    pub source_dir: PathBuf,
    /// Name of the output subdirectory created inside `source_dir`.
    pub output_dir_name: String,
    /// Detection parameters applied to every image.
    pub detection: DetectionConfig,
    /// Worker threads. `None` processes files one after another.
    pub jobs: Option<usize>,
}

impl BatchConfig {
    /// Default name of the output subdirectory.
    pub const DEFAULT_OUTPUT_DIR_NAME: &str = "labeled_images";

    /// Sequential batch over `source_dir` with default detection settings.
    #[must_use]
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir_name: Self::DEFAULT_OUTPUT_DIR_NAME.to_string(),
            detection: DetectionConfig::default(),
            jobs: None,
        }
    }

    /// Where labeled images are written.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.source_dir.join(&self.output_dir_name)
    }
}

/// A file that was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// The input file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// What a batch run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Output files written, in input order.
    pub written: Vec<PathBuf>,
    /// Inputs that could not be loaded, in input order.
    pub skipped: Vec<SkippedFile>,
}

enum Outcome {
    Written(PathBuf),
    Skipped(SkippedFile),
}

/// Label every supported image in `config.source_dir`.
///
/// The output directory is created if missing and existing files in it
/// are overwritten. With `config.jobs` set, files are processed on a
/// dedicated pool of that many threads; the report order is the same
/// either way.
///
/// # Errors
///
/// Returns [`IoError::Pipeline`] for an invalid detection config,
/// [`IoError::WorkerPool`] if the pool cannot start, and
/// [`IoError::Io`] for any listing or write failure. Unreadable and
/// undecodable files are not errors; they appear in
/// [`BatchReport::skipped`].
pub fn run_batch(config: &BatchConfig) -> Result<BatchReport, IoError> {
    config.detection.validate()?;

    let files = fs::list_images(&config.source_dir)?;
    let output_dir = fs::ensure_dir(&config.source_dir, &config.output_dir_name)?;
    debug!(
        "found {} image files in {}",
        files.len(),
        config.source_dir.display()
    );

    let label = |path: &PathBuf| label_file(path, &output_dir, &config.detection);
    let outcomes: Vec<Outcome> = match config.jobs {
        Some(jobs) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| IoError::WorkerPool(e.to_string()))?;
            pool.install(|| files.par_iter().map(label).collect::<Result<_, _>>())?
        }
        None => files.iter().map(label).collect::<Result<_, _>>()?,
    };

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Written(path) => report.written.push(path),
            Outcome::Skipped(skip) => report.skipped.push(skip),
        }
    }
    info!(
        "Labeled {} images, skipped {}",
        report.written.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Load, label, and write one file.
fn label_file(
    path: &Path,
    output_dir: &Path,
    detection: &DetectionConfig,
) -> Result<Outcome, IoError> {
    let file_name = path.file_name().unwrap_or_default();
    let display_name = file_name.to_string_lossy();

    let bytes = match fs::read_bytes(path) {
        Ok(bytes) => bytes,
        Err(err) => return Ok(skip(path, &display_name, &err)),
    };
    let image = match codec::decode_color(&bytes) {
        Ok(image) => image,
        Err(err) => {
            let err = decode_error(&*display_name, err);
            if !err.is_unloadable_image() {
                return Err(err);
            }
            return Ok(skip(path, &display_name, &err));
        }
    };

    let output_path = output_dir.join(file_name);
    let format = fs::format_for_path(&output_path)?;
    let detection = fissure_pipeline::process(image, detection)?;
    debug!(
        "{display_name}: {} contours highlighted",
        detection.contours.len()
    );
    let encoded = codec::encode(&detection.image, format)?;
    fs::write_bytes(&output_path, &encoded)?;

    info!("Labeled image saved as {}", output_path.display());
    Ok(Outcome::Written(output_path))
}

fn skip(path: &Path, display_name: &str, err: &IoError) -> Outcome {
    warn!("Skipping {display_name}: unable to load image.");
    debug!("{err}");
    Outcome::Skipped(SkippedFile {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}
