//! Fetch an image over HTTP and label it.
//!
//! Unlike the batch driver, a remote image that does not decode is an
//! error: there is nothing else to move on to.

use std::path::{Path, PathBuf};

use fissure_pipeline::{DetectionConfig, Dimensions, codec};
use log::{debug, info};
use reqwest::StatusCode;

use crate::error::{IoError, NetworkError, decode_error};
use crate::fs;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("fissure/", env!("CARGO_PKG_VERSION"));

/// What [`label_remote`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteLabel {
    /// The URL the image came from.
    pub url: String,
    /// Where the labeled image was written.
    pub output: PathBuf,
    /// Size of the fetched image.
    pub dimensions: Dimensions,
    /// Number of contours drawn on it.
    pub contours: usize,
}

/// GET `url` and return the response body.
///
/// # Errors
///
/// Returns [`NetworkError::HttpStatus`] for a non-success status and
/// [`NetworkError::Transport`] if the client cannot be built, the
/// request cannot be sent, or the body cannot be read.
pub fn fetch_bytes(url: &str) -> Result<Vec<u8>, IoError> {
    let transport = |source| NetworkError::Transport {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(transport)?;
    let response = client.get(url).send().map_err(transport)?;
    check_status(url, response.status())?;

    let body = response.bytes().map_err(transport)?;
    debug!("fetched {} bytes from {url}", body.len());
    Ok(body.to_vec())
}

/// Fetch `url`, run the pipeline, and write the result to `output`.
///
/// The output is encoded in the format named by the extension of
/// `output`, whatever the remote encoding was.
///
/// # Errors
///
/// Returns [`IoError::Network`] if the fetch fails, [`IoError::Decode`]
/// if the body is not an image, [`IoError::Pipeline`] for an invalid
/// config or unsupported output extension, and [`IoError::Io`] if the
/// file cannot be written.
pub fn label_remote(
    url: &str,
    config: &DetectionConfig,
    output: &Path,
) -> Result<RemoteLabel, IoError> {
    config.validate()?;
    let format = fs::format_for_path(output)?;
    let bytes = fetch_bytes(url)?;
    label_bytes(url, &bytes, config, output, format)
}

fn label_bytes(
    url: &str,
    bytes: &[u8],
    config: &DetectionConfig,
    output: &Path,
    format: fissure_pipeline::ImageFormat,
) -> Result<RemoteLabel, IoError> {
    let image = codec::decode_color(bytes).map_err(|e| decode_error(url, e))?;
    let dimensions = Dimensions::of(&image);

    let detection = fissure_pipeline::process(image, config)?;
    let encoded = codec::encode(&detection.image, format)?;
    fs::write_bytes(output, &encoded)?;
    info!("Labeled image saved as {}", output.display());

    Ok(RemoteLabel {
        url: url.to_string(),
        output: output.to_path_buf(),
        dimensions,
        contours: detection.contours.len(),
    })
}

/// Map a response status to an error unless it is a success.
fn check_status(url: &str, status: StatusCode) -> Result<(), NetworkError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(NetworkError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}
