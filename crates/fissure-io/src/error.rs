//! Error types for filesystem and network operations.

use std::path::PathBuf;

use fissure_pipeline::PipelineError;

/// Failures talking to a remote image host.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
}

/// Errors returned by `fissure-io` operations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Remote fetch failed.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Bytes from `origin` (a path or URL) are not a decodable image.
    #[error("unable to load image {origin}: {source}")]
    Decode {
        /// Where the bytes came from.
        origin: String,
        /// Decoder failure.
        #[source]
        source: PipelineError,
    },

    /// The pipeline rejected the image or configuration.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A filesystem operation failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path being read, written or listed.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The batch worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

impl IoError {
    /// Wrap an OS error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the error means the input was not a loadable
    /// image, as opposed to a failure of the environment.
    #[must_use]
    pub const fn is_unloadable_image(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Classify a decode-time pipeline error.
///
/// Empty or undecodable bytes become [`IoError::Decode`] tagged with
/// `origin`; anything else passes through as [`IoError::Pipeline`].
pub(crate) fn decode_error(origin: impl Into<String>, err: PipelineError) -> IoError {
    match err {
        PipelineError::EmptyInput | PipelineError::Decode(_) => IoError::Decode {
            origin: origin.into(),
            source: err,
        },
        other => IoError::Pipeline(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let err = IoError::from(NetworkError::HttpStatus {
            url: "https://example.com/a.png".to_string(),
            status: 404,
        });
        assert_eq!(err.to_string(), "HTTP 404 fetching https://example.com/a.png");
    }

    #[test]
    fn io_error_names_the_path() {
        let err = IoError::io(
            "/no/such/dir",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert_eq!(err.to_string(), "/no/such/dir: not found");
    }

    #[test]
    fn empty_and_corrupt_bytes_are_unloadable() {
        assert!(decode_error("a.png", PipelineError::EmptyInput).is_unloadable_image());
        let corrupt = fissure_pipeline::codec::decode_color(&[1, 2, 3]).err();
        assert!(corrupt.is_some_and(|e| decode_error("b.png", e).is_unloadable_image()));
    }

    #[test]
    fn other_pipeline_errors_pass_through() {
        let err = decode_error("c.png", PipelineError::InvalidConfig("bad".to_string()));
        assert!(matches!(err, IoError::Pipeline(PipelineError::InvalidConfig(_))));
        assert!(!err.is_unloadable_image());
    }
}
