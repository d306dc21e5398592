//! Contour extraction and length filtering.
//!
//! Outermost borders of the edge map are traced with Suzuki-Abe border
//! following (`imageproc::contours::find_contours`), reduced to their
//! direction-change vertices, measured, and filtered by arc length.
//! Holes and anything nested inside a hole are discarded.

use imageproc::contours::BorderType;

use crate::types::{Contour, DetectionConfig, Dimensions, GrayImage, Point};

/// Trace the outermost borders of the foreground (non-zero) regions.
///
/// Returns the full 8-connected pixel chain of each border, in raster
/// scan order of the first pixel of each border.
#[must_use]
pub fn trace_external(edges: &GrayImage) -> Vec<Vec<Point>> {
    imageproc::contours::find_contours::<u32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points.into_iter().map(|p| Point::new(p.x, p.y)).collect())
        .collect()
}

/// Drop points that sit inside a straight run of the chain.
///
/// The chain is treated as a cycle, so a run that wraps past the end
/// also collapses. The first point is always kept.
#[must_use]
pub fn compress_chain(chain: &[Point]) -> Vec<Point> {
    let n = chain.len();
    if n <= 2 {
        return chain.to_vec();
    }

    let step = |from: Point, to: Point| {
        (
            i64::from(to.x) - i64::from(from.x),
            i64::from(to.y) - i64::from(from.y),
        )
    };

    let mut out = Vec::with_capacity(n);
    out.push(chain[0]);
    for i in 1..n {
        let incoming = step(chain[i - 1], chain[i]);
        let outgoing = step(chain[i], chain[(i + 1) % n]);
        if incoming != outgoing {
            out.push(chain[i]);
        }
    }
    out
}

/// Sum of Euclidean distances between consecutive points.
///
/// When `closed` is `true` the segment from the last point back to the
/// first is included. Empty and single-point sequences have length 0.
#[must_use]
pub fn arc_length(points: &[Point], closed: bool) -> f64 {
    let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    match (closed, points.first(), points.last()) {
        (true, Some(&first), Some(&last)) if points.len() > 1 => open + last.distance(first),
        _ => open,
    }
}

/// Keep contours strictly longer than `min_length`, preserving order.
#[must_use]
pub fn filter_by_length(contours: Vec<Contour>, min_length: f64) -> Vec<Contour> {
    contours
        .into_iter()
        .filter(|c| c.arc_length() > min_length)
        .collect()
}

/// Trace, compress and measure every outermost border in `edges`.
#[must_use]
pub fn trace_contours(edges: &GrayImage, closed: bool) -> Vec<Contour> {
    trace_external(edges)
        .iter()
        .map(|chain| Contour::new(compress_chain(chain), closed))
        .collect()
}

/// Contours of `edges` that pass the configured length filter.
///
/// This is stage 5 of the pipeline, between edge detection and the
/// overlay.
#[must_use]
pub fn extract_contours(edges: &GrayImage, config: &DetectionConfig) -> Vec<Contour> {
    let min_length = config.effective_min_arc_length(Dimensions::of(edges));
    filter_by_length(trace_contours(edges, config.closed_arc_length), min_length)
}
