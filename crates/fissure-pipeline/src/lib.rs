//! fissure-pipeline: Pure crack-highlighting image pipeline (sans-IO).
//!
//! Finds elongated dark features in a color image and draws their
//! outlines on top of it:
//! grayscale -> blur -> adaptive threshold -> closing -> edge detection
//! -> contour tracing -> length filter -> overlay.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! buffers and byte slices; filesystem and network access live in
//! `fissure-io`.

pub mod blur;
pub mod canny;
pub mod codec;
pub mod contour;
pub mod diagnostics;
pub mod edge;
pub mod grayscale;
pub mod kernel;
pub mod morphology;
pub mod pipeline;
pub mod render;
pub mod threshold;
pub mod types;

pub use diagnostics::{Clock, PipelineDiagnostics, process_with_diagnostics};
pub use pipeline::Pipeline;
pub use types::{
    Contour, Detection, DetectionConfig, Dimensions, GrayImage, MinLengthScaling, PipelineError,
    Point, RgbImage,
};

/// Re-export so callers can name encode formats without depending on
/// `image` directly.
pub use image::ImageFormat;

/// Run the full detection pipeline on a color buffer.
///
/// Takes ownership of `image`, draws every contour longer than the
/// configured minimum onto it, and returns it together with the
/// contours.
///
/// # Pipeline steps
///
/// 1. Grayscale conversion and Gaussian smoothing
/// 2. Adaptive threshold (dark features become foreground)
/// 3. Morphological closing
/// 4. Edge detection
/// 5. Outermost contour tracing and arc-length filtering
/// 6. Overlay rendering
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` is invalid and
/// [`PipelineError::InvalidInput`] if the image has zero area.
pub fn process(image: RgbImage, config: &DetectionConfig) -> Result<Detection, PipelineError> {
    Ok(Pipeline::new(image, config.clone())?
        .grayscale()?
        .blur()
        .binarize()
        .close()
        .detect_edges()
        .extract_contours()
        .render()
        .into_detection())
}

/// Decode, process, and re-encode an image held in memory.
///
/// The output is encoded as `format` regardless of the input encoding.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] or [`PipelineError::Decode`]
/// if the bytes are not a decodable image, [`PipelineError::Encode`] if
/// the result cannot be encoded, and anything [`process`] returns.
pub fn process_bytes(
    bytes: &[u8],
    format: ImageFormat,
    config: &DetectionConfig,
) -> Result<Vec<u8>, PipelineError> {
    let image = codec::decode_color(bytes)?;
    let detection = process(image, config)?;
    codec::encode(&detection.image, format)
}
