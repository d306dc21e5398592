//! fissure-io: filesystem and network I/O around the detection pipeline.
//!
//! Lists image files, reads and writes them, fetches images over HTTP,
//! and drives [`fissure_pipeline`] over a whole directory. All pixel
//! work is delegated to the pipeline crate.

pub mod batch;
pub mod error;
pub mod fetch;
pub mod fs;

pub use batch::{BatchConfig, BatchReport, SkippedFile, run_batch};
pub use error::{IoError, NetworkError};
pub use fetch::{RemoteLabel, fetch_bytes, label_remote};
