//! Shared types for the fissure detection pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intensity buffers and masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the color
/// buffer that gets annotated without depending on `image` directly.
pub use image::RgbImage;

/// A pixel position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column (pixels from the left edge).
    pub x: u32,
    /// Row (pixels from the top edge).
    pub y: u32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

/// A traced boundary curve and its arc length.
///
/// Points are the direction-change vertices of the traced border, in
/// tracing order. The arc length is computed once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    points: Vec<Point>,
    arc_length: f64,
}

impl Contour {
    /// Build a contour from its vertices.
    ///
    /// When `closed` is `true` the arc length includes the segment from
    /// the last vertex back to the first.
    #[must_use]
    pub fn new(points: Vec<Point>, closed: bool) -> Self {
        let arc_length = crate::contour::arc_length(&points, closed);
        Self { points, arc_length }
    }

    /// The contour vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Cumulative Euclidean length along the vertices.
    #[must_use]
    pub const fn arc_length(&self) -> f64 {
        self.arc_length
    }

    /// Number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the contour has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of any image buffer.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Total pixel count.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Length of the image diagonal in pixels.
    #[must_use]
    pub fn diagonal(self) -> f64 {
        f64::from(self.width).hypot(f64::from(self.height))
    }

    /// Reject buffers with zero width or height.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if either side is zero.
    pub fn ensure_nonempty(self) -> Result<Self, PipelineError> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::InvalidInput {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }
}

/// How the minimum contour length relates to image resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MinLengthScaling {
    /// Use `min_arc_length` as an absolute pixel length.
    #[default]
    Fixed,
    /// Scale `min_arc_length` by `diagonal / REFERENCE_DIAGONAL`, so the
    /// same fraction of the image is required at every resolution.
    Diagonal,
}

impl MinLengthScaling {
    /// Diagonal (in pixels) at which [`Self::Diagonal`] leaves the
    /// threshold unchanged.
    pub const REFERENCE_DIAGONAL: f64 = 1000.0;

    /// Resolve the threshold for an image of the given size.
    #[must_use]
    pub fn apply(self, min_arc_length: f64, dimensions: Dimensions) -> f64 {
        match self {
            Self::Fixed => min_arc_length,
            Self::Diagonal => min_arc_length * dimensions.diagonal() / Self::REFERENCE_DIAGONAL,
        }
    }
}

/// Algorithm parameters for one detection run.
///
/// Defaults reproduce the field-tuned baseline: 5x5 smoothing, 11-pixel
/// adaptive block with offset 2, 3x3 closing, Canny 50/150, minimum arc
/// length 100, 2-pixel red overlay.
///
/// Deserialization fills missing fields from the defaults, so a partial
/// JSON object only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Side of the square Gaussian smoothing kernel (odd, at most
    /// [`Self::MAX_KERNEL_SIZE`]).
    pub blur_kernel_size: u32,

    /// Side of the local window used by the adaptive threshold (odd, >= 3).
    pub threshold_block_size: u32,

    /// Amount subtracted from the local mean before comparing.
    /// Larger values make the threshold stricter. Must be within
    /// ±[`Self::MAX_THRESHOLD_OFFSET`].
    pub threshold_offset: i32,

    /// Side of the square structuring element used for closing (odd).
    pub morph_kernel_size: u32,

    /// Canny low threshold. Gradients between `canny_low` and
    /// `canny_high` survive only when connected to a strong edge.
    pub canny_low: f32,

    /// Canny high threshold. Gradients above it are definite edges.
    pub canny_high: f32,

    /// Use the L2 gradient magnitude instead of `|gx| + |gy|`.
    pub l2_gradient: bool,

    /// Contours must be strictly longer than this to be kept.
    pub min_arc_length: f64,

    /// How `min_arc_length` adapts to image resolution.
    pub min_length_scaling: MinLengthScaling,

    /// Measure contours as closed loops (adds the last-to-first segment).
    pub closed_arc_length: bool,

    /// Overlay color in RGB order.
    pub highlight_color: [u8; 3],

    /// Overlay stroke width in pixels.
    pub stroke_width: f32,
}

impl DetectionConfig {
    /// Default smoothing kernel size.
    pub const DEFAULT_BLUR_KERNEL_SIZE: u32 = 5;
    /// Default adaptive threshold block size.
    pub const DEFAULT_THRESHOLD_BLOCK_SIZE: u32 = 11;
    /// Default adaptive threshold offset.
    pub const DEFAULT_THRESHOLD_OFFSET: i32 = 2;
    /// Default structuring element size.
    pub const DEFAULT_MORPH_KERNEL_SIZE: u32 = 3;
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default minimum arc length.
    pub const DEFAULT_MIN_ARC_LENGTH: f64 = 100.0;
    /// Default overlay color (pure red).
    pub const DEFAULT_HIGHLIGHT_COLOR: [u8; 3] = [255, 0, 0];
    /// Default overlay stroke width.
    pub const DEFAULT_STROKE_WIDTH: f32 = 2.0;

    /// Largest accepted kernel, block, or structuring element side.
    pub const MAX_KERNEL_SIZE: u32 = 255;
    /// Largest accepted threshold offset magnitude. Beyond it the mask
    /// is uniformly foreground or background for 8-bit input.
    pub const MAX_THRESHOLD_OFFSET: i32 = 255;

    /// Check parameter invariants that the stages rely on.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// violated invariant.
    pub fn validate(&self) -> Result<(), PipelineError> {
        fn odd(name: &str, value: u32, min: u32) -> Result<(), PipelineError> {
            if value < min || value > DetectionConfig::MAX_KERNEL_SIZE || value % 2 == 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be odd and between {min} and {}, got {value}",
                    DetectionConfig::MAX_KERNEL_SIZE
                )));
            }
            Ok(())
        }

        odd("blur_kernel_size", self.blur_kernel_size, 1)?;
        odd("threshold_block_size", self.threshold_block_size, 3)?;
        odd("morph_kernel_size", self.morph_kernel_size, 1)?;

        if self.threshold_offset.unsigned_abs() > Self::MAX_THRESHOLD_OFFSET.unsigned_abs() {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold_offset must be within ±{}, got {}",
                Self::MAX_THRESHOLD_OFFSET,
                self.threshold_offset
            )));
        }

        if !self.canny_low.is_finite() || !self.canny_high.is_finite() {
            return Err(PipelineError::InvalidConfig(
                "canny thresholds must be finite".to_string(),
            ));
        }
        if self.canny_low > self.canny_high {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low ({}) must not exceed canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if !self.min_arc_length.is_finite() || self.min_arc_length < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "min_arc_length must be finite and non-negative, got {}",
                self.min_arc_length
            )));
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "stroke_width must be positive, got {}",
                self.stroke_width
            )));
        }
        Ok(())
    }

    /// Minimum arc length after resolution scaling.
    #[must_use]
    pub fn effective_min_arc_length(&self, dimensions: Dimensions) -> f64 {
        self.min_length_scaling
            .apply(self.min_arc_length, dimensions)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: Self::DEFAULT_BLUR_KERNEL_SIZE,
            threshold_block_size: Self::DEFAULT_THRESHOLD_BLOCK_SIZE,
            threshold_offset: Self::DEFAULT_THRESHOLD_OFFSET,
            morph_kernel_size: Self::DEFAULT_MORPH_KERNEL_SIZE,
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            l2_gradient: false,
            min_arc_length: Self::DEFAULT_MIN_ARC_LENGTH,
            min_length_scaling: MinLengthScaling::default(),
            closed_arc_length: false,
            highlight_color: Self::DEFAULT_HIGHLIGHT_COLOR,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
        }
    }
}

/// Result of running the full pipeline on one image.
#[derive(Debug, Clone)]
pub struct Detection {
    /// The input color buffer with the retained contours drawn on it.
    pub image: RgbImage,
    /// Contours that survived length filtering, in discovery order.
    pub contours: Vec<Contour>,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The bytes do not decode into a supported image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The annotated buffer could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The file extension is not one of the supported formats.
    #[error("unsupported image format: {0:?}")]
    UnsupportedFormat(String),

    /// A buffer with zero width or height reached a stage.
    #[error("image has zero area ({width}x{height})")]
    InvalidInput {
        /// Offending width.
        width: u32,
        /// Offending height.
        height: u32,
    },

    /// Detection configuration is invalid.
    #[error("invalid detection configuration: {0}")]
    InvalidConfig(String),
}
