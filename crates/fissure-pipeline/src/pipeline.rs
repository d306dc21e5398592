//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! [`crate::process`] runs every stage in one call. [`Pipeline`] lets
//! the caller drive execution one step at a time:
//!
//! ```rust
//! # use fissure_pipeline::{DetectionConfig, Pipeline, PipelineError, RgbImage};
//! # fn run(image: RgbImage) -> Result<(), PipelineError> {
//! let detection = Pipeline::new(image, DetectionConfig::default())?
//!     .grayscale()?
//!     .blur()
//!     .binarize()
//!     .close()
//!     .detect_edges()
//!     .extract_contours()
//!     .render()
//!     .into_detection();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state. Only
//! the current intermediate buffer is kept; the color buffer rides
//! along untouched until [`ContoursExtracted::render`] draws on it.

use crate::diagnostics::StageMetrics;
use crate::types::{
    Contour, Detection, DetectionConfig, Dimensions, GrayImage, PipelineError, RgbImage,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`grayscale`](Self::grayscale) to advance.
#[must_use = "pipeline stages are consumed by advancing — call .grayscale() to continue"]
pub struct Pending {
    config: DetectionConfig,
    original: RgbImage,
}

impl Pending {
    /// The color buffer that will be annotated.
    #[must_use]
    pub const fn original(&self) -> &RgbImage {
        &self.original
    }

    /// Convert to intensity and advance to the [`Intensity`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the image has zero
    /// width or height.
    pub fn grayscale(self) -> Result<Intensity, PipelineError> {
        let gray = crate::grayscale::to_intensity(&self.original)?;
        log::debug!("intensity: {}x{}", gray.width(), gray.height());
        Ok(Intensity {
            config: self.config,
            original: self.original,
            gray,
        })
    }
}

// ───────────────────────── Stage 1: Intensity ────────────────────────

/// Pipeline state after grayscale conversion.
#[must_use = "pipeline stages are consumed by advancing — call .blur() to continue"]
pub struct Intensity {
    config: DetectionConfig,
    original: RgbImage,
    gray: GrayImage,
}

impl Intensity {
    /// The single-channel intensity image.
    #[must_use]
    pub const fn intensity(&self) -> &GrayImage {
        &self.gray
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Grayscale {
            width: self.gray.width(),
            height: self.gray.height(),
        }
    }

    /// Smooth the intensity image and advance to [`Smoothed`].
    pub fn blur(self) -> Smoothed {
        let smooth = crate::blur::gaussian_blur(&self.gray, self.config.blur_kernel_size);
        log::debug!("blur: kernel {}", self.config.blur_kernel_size);
        Smoothed {
            config: self.config,
            original: self.original,
            smooth,
        }
    }
}

// ───────────────────────── Stage 2: Smoothed ─────────────────────────

/// Pipeline state after Gaussian smoothing.
#[must_use = "pipeline stages are consumed by advancing — call .binarize() to continue"]
pub struct Smoothed {
    config: DetectionConfig,
    original: RgbImage,
    smooth: GrayImage,
}

impl Smoothed {
    /// The smoothed intensity image.
    #[must_use]
    pub const fn smoothed(&self) -> &GrayImage {
        &self.smooth
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Blur {
            kernel_size: self.config.blur_kernel_size,
        }
    }

    /// Apply the adaptive threshold and advance to [`Binarized`].
    pub fn binarize(self) -> Binarized {
        let mask = crate::threshold::adaptive_threshold(
            &self.smooth,
            self.config.threshold_block_size,
            self.config.threshold_offset,
        );
        let foreground = crate::threshold::count_foreground(&mask);
        log::debug!("binarize: {foreground} foreground pixels");
        Binarized {
            config: self.config,
            original: self.original,
            mask,
            foreground,
        }
    }
}

// ───────────────────────── Stage 3: Binarized ────────────────────────

/// Pipeline state after adaptive thresholding.
#[must_use = "pipeline stages are consumed by advancing — call .close() to continue"]
pub struct Binarized {
    config: DetectionConfig,
    original: RgbImage,
    mask: GrayImage,
    foreground: u64,
}

impl Binarized {
    /// The binary mask (255 = darker than its surroundings).
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Threshold {
            block_size: self.config.threshold_block_size,
            offset: self.config.threshold_offset,
            foreground_pixels: self.foreground,
            total_pixels: Dimensions::of(&self.mask).pixel_count(),
        }
    }

    /// Close the mask and advance to [`Closed`].
    pub fn close(self) -> Closed {
        let mask = crate::morphology::close(&self.mask, self.config.morph_kernel_size);
        let foreground = crate::threshold::count_foreground(&mask);
        log::debug!(
            "close: {} -> {foreground} foreground pixels",
            self.foreground
        );
        Closed {
            config: self.config,
            original: self.original,
            mask,
            foreground_before: self.foreground,
            foreground,
        }
    }
}

// ───────────────────────── Stage 4: Closed ───────────────────────────

/// Pipeline state after morphological closing.
#[must_use = "pipeline stages are consumed by advancing — call .detect_edges() to continue"]
pub struct Closed {
    config: DetectionConfig,
    original: RgbImage,
    mask: GrayImage,
    foreground_before: u64,
    foreground: u64,
}

impl Closed {
    /// The closed binary mask.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Close {
            kernel_size: self.config.morph_kernel_size,
            foreground_before: self.foreground_before,
            foreground_after: self.foreground,
        }
    }

    /// Run edge detection and advance to [`EdgesDetected`].
    pub fn detect_edges(self) -> EdgesDetected {
        let edges = crate::edge::detect_edges(
            &self.mask,
            self.config.canny_low,
            self.config.canny_high,
            self.config.l2_gradient,
        );
        let edge_pixels = crate::threshold::count_foreground(&edges);
        log::debug!("edges: {edge_pixels} edge pixels");
        EdgesDetected {
            config: self.config,
            original: self.original,
            edges,
            edge_pixels,
        }
    }
}

// ───────────────────────── Stage 5: EdgesDetected ────────────────────

/// Pipeline state after edge detection.
#[must_use = "pipeline stages are consumed by advancing — call .extract_contours() to continue"]
pub struct EdgesDetected {
    config: DetectionConfig,
    original: RgbImage,
    edges: GrayImage,
    edge_pixels: u64,
}

impl EdgesDetected {
    /// The binary edge map.
    #[must_use]
    pub const fn edges(&self) -> &GrayImage {
        &self.edges
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::EdgeDetection {
            low_threshold: self.config.canny_low,
            high_threshold: self.config.canny_high,
            l2_gradient: self.config.l2_gradient,
            edge_pixels: self.edge_pixels,
            total_pixels: Dimensions::of(&self.edges).pixel_count(),
        }
    }

    /// Trace and filter contours, advancing to [`ContoursExtracted`].
    ///
    /// The edge map is dropped here; only the contours move on.
    pub fn extract_contours(self) -> ContoursExtracted {
        let dimensions = Dimensions::of(&self.edges);
        let min_arc_length = self.config.effective_min_arc_length(dimensions);
        let traced = crate::contour::trace_contours(&self.edges, self.config.closed_arc_length);
        let traced_count = traced.len();
        let contours = crate::contour::filter_by_length(traced, min_arc_length);
        log::debug!(
            "contours: {traced_count} traced, {} longer than {min_arc_length:.1}",
            contours.len()
        );
        ContoursExtracted {
            config: self.config,
            original: self.original,
            contours,
            traced_count,
            min_arc_length,
        }
    }
}

// ───────────────────────── Stage 6: ContoursExtracted ────────────────

/// Pipeline state after contour tracing and length filtering.
#[must_use = "pipeline stages are consumed by advancing — call .render() to continue"]
pub struct ContoursExtracted {
    config: DetectionConfig,
    original: RgbImage,
    contours: Vec<Contour>,
    traced_count: usize,
    min_arc_length: f64,
}

impl ContoursExtracted {
    /// Contours that passed the length filter, in discovery order.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Number of outermost borders traced before filtering.
    #[must_use]
    pub const fn traced_count(&self) -> usize {
        self.traced_count
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Contours {
            traced: self.traced_count,
            retained: self.contours.len(),
            min_arc_length: self.min_arc_length,
            total_arc_length: self.contours.iter().map(Contour::arc_length).sum(),
        }
    }

    /// Draw the retained contours onto the color buffer.
    pub fn render(self) -> Rendered {
        let image = crate::render::draw_contours(
            self.original,
            &self.contours,
            self.config.highlight_color,
            self.config.stroke_width,
        );
        Rendered {
            stroke_width: self.config.stroke_width,
            detection: Detection {
                image,
                contours: self.contours,
            },
        }
    }
}

// ───────────────────────── Stage 7: Rendered ─────────────────────────

/// Final pipeline state.
///
/// Call [`into_detection`](Self::into_detection) to take the result.
#[must_use = "call .into_detection() to extract the Detection"]
pub struct Rendered {
    stroke_width: f32,
    detection: Detection,
}

impl Rendered {
    /// The annotated color buffer.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.detection.image
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Render {
            contours_drawn: self.detection.contours.len(),
            stroke_width: self.stroke_width,
        }
    }

    /// Consume the pipeline and return the annotated image and contours.
    #[must_use]
    pub fn into_detection(self) -> Detection {
        self.detection
    }
}

/// Entry point for the staged pipeline.
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or run them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over `image` with `config`.
    ///
    /// No pixel work happens here; the configuration is only checked.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `config` fails
    /// [`DetectionConfig::validate`].
    #[allow(clippy::new_ret_no_self)]
    pub fn new(image: RgbImage, config: DetectionConfig) -> Result<Pending, PipelineError> {
        config.validate()?;
        Ok(Pending {
            config,
            original: image,
        })
    }
}
