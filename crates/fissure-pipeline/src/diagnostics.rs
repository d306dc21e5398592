//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! Intended for parameter tuning. [`process_with_diagnostics`] runs the
//! staged pipeline and records a [`StageDiagnostics`] per stage.
//!
//! The crate does no I/O, so the time source is injected through the
//! [`Clock`] trait. Binaries implement it over `std::time::Instant`;
//! tests use a deterministic fake.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{
    Binarized, Closed, ContoursExtracted, EdgesDetected, Intensity, Pipeline, Rendered, Smoothed,
};
use crate::types::{Detection, DetectionConfig, Dimensions, PipelineError, RgbImage};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Monotonic time source used to measure stage durations.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: grayscale conversion.
    pub grayscale: StageDiagnostics,
    /// Stage 1b: Gaussian smoothing.
    pub blur: StageDiagnostics,
    /// Stage 2: adaptive threshold.
    pub threshold: StageDiagnostics,
    /// Stage 3: morphological closing.
    pub close: StageDiagnostics,
    /// Stage 4: edge detection.
    pub edge_detection: StageDiagnostics,
    /// Stage 5: contour tracing and filtering.
    pub contours: StageDiagnostics,
    /// Stage 6: overlay rendering.
    pub render: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Grayscale conversion.
    Grayscale {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// Gaussian smoothing.
    Blur {
        /// Side of the square kernel.
        kernel_size: u32,
    },
    /// Adaptive threshold.
    Threshold {
        /// Local window size.
        block_size: u32,
        /// Offset subtracted from the local mean.
        offset: i32,
        /// Pixels marked as foreground.
        foreground_pixels: u64,
        /// Total pixel count.
        total_pixels: u64,
    },
    /// Morphological closing.
    Close {
        /// Side of the structuring element.
        kernel_size: u32,
        /// Foreground pixels before closing.
        foreground_before: u64,
        /// Foreground pixels after closing.
        foreground_after: u64,
    },
    /// Edge detection.
    EdgeDetection {
        /// Configured low threshold.
        low_threshold: f32,
        /// Configured high threshold.
        high_threshold: f32,
        /// Whether the L2 gradient magnitude was used.
        l2_gradient: bool,
        /// Number of edge pixels in the output.
        edge_pixels: u64,
        /// Total pixel count for computing edge density.
        total_pixels: u64,
    },
    /// Contour tracing and length filtering.
    Contours {
        /// Outermost borders traced.
        traced: usize,
        /// Contours longer than the threshold.
        retained: usize,
        /// Effective minimum arc length after scaling.
        min_arc_length: f64,
        /// Sum of the retained arc lengths.
        total_arc_length: f64,
    },
    /// Overlay rendering.
    Render {
        /// Contours drawn onto the image.
        contours_drawn: usize,
        /// Stroke width in pixels.
        stroke_width: f32,
    },
}

/// High-level summary for the entire run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Contours traced before filtering.
    pub traced_contours: usize,
    /// Contours kept and drawn.
    pub retained_contours: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<20} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<20} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Contours: {} traced  |  {} retained",
            self.summary.traced_contours, self.summary.retained_contours,
        ));

        lines.join("\n")
    }

    /// Stage diagnostics in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 7] {
        [
            ("Grayscale", &self.grayscale),
            ("Blur", &self.blur),
            ("Threshold", &self.threshold),
            ("Close", &self.close),
            ("Edge Detection", &self.edge_detection),
            ("Contours", &self.contours),
            ("Render", &self.render),
        ]
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Grayscale { width, height } => format!("{width}x{height}"),
        StageMetrics::Blur { kernel_size } => format!("kernel={kernel_size}"),
        StageMetrics::Threshold {
            block_size,
            offset,
            foreground_pixels,
            total_pixels,
        } => format!(
            "block={block_size} offset={offset} fg={foreground_pixels} ({:.1}%)",
            percent(*foreground_pixels, *total_pixels),
        ),
        StageMetrics::Close {
            kernel_size,
            foreground_before,
            foreground_after,
        } => format!("kernel={kernel_size} fg={foreground_before}->{foreground_after}"),
        StageMetrics::EdgeDetection {
            low_threshold,
            high_threshold,
            l2_gradient,
            edge_pixels,
            total_pixels,
        } => format!(
            "low={low_threshold:.1} high={high_threshold:.1} {} edges={edge_pixels} ({:.1}%)",
            if *l2_gradient { "L2" } else { "L1" },
            percent(*edge_pixels, *total_pixels),
        ),
        StageMetrics::Contours {
            traced,
            retained,
            min_arc_length,
            total_arc_length,
        } => format!(
            "{traced} traced, {retained} > {min_arc_length:.1}px (total length {total_arc_length:.1}px)",
        ),
        StageMetrics::Render {
            contours_drawn,
            stroke_width,
        } => format!("{contours_drawn} drawn, width={stroke_width:.1}"),
    }
}

/// Time one stage transition and capture its metrics.
fn timed<C: Clock, T>(
    clock: &C,
    advance: impl FnOnce() -> Result<T, PipelineError>,
    metrics: impl FnOnce(&T) -> StageMetrics,
) -> Result<(T, StageDiagnostics), PipelineError> {
    let start = clock.now();
    let next = advance()?;
    let duration = clock.elapsed(&start);
    let diag = StageDiagnostics {
        duration,
        metrics: metrics(&next),
    };
    Ok((next, diag))
}

/// Run the full pipeline, recording per-stage timings and metrics.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] for an invalid `config`
/// and [`PipelineError::InvalidInput`] for a zero-area image.
pub fn process_with_diagnostics<C: Clock>(
    image: RgbImage,
    config: &DetectionConfig,
    clock: &C,
) -> Result<(Detection, PipelineDiagnostics), PipelineError> {
    let total_start = clock.now();
    let dimensions = Dimensions::of(&image);
    let pending = Pipeline::new(image, config.clone())?;

    let (intensity, grayscale) = timed(clock, || pending.grayscale(), Intensity::metrics)?;
    let (smoothed, blur) = timed(clock, || Ok(intensity.blur()), Smoothed::metrics)?;
    let (binarized, threshold) = timed(clock, || Ok(smoothed.binarize()), Binarized::metrics)?;
    let (closed, close) = timed(clock, || Ok(binarized.close()), Closed::metrics)?;
    let (edges, edge_detection) =
        timed(clock, || Ok(closed.detect_edges()), EdgesDetected::metrics)?;
    let (extracted, contours) = timed(
        clock,
        || Ok(edges.extract_contours()),
        ContoursExtracted::metrics,
    )?;
    let traced_contours = extracted.traced_count();
    let (rendered, render) = timed(clock, || Ok(extracted.render()), Rendered::metrics)?;

    let detection = rendered.into_detection();
    let diagnostics = PipelineDiagnostics {
        grayscale,
        blur,
        threshold,
        close,
        edge_detection,
        contours,
        render,
        total_duration: clock.elapsed(&total_start),
        summary: PipelineSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            traced_contours,
            retained_contours: detection.contours.len(),
        },
    };
    Ok((detection, diagnostics))
}
