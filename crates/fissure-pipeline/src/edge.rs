//! Edge extraction stage.
//!
//! Runs [`crate::canny::canny`] on the cleaned binary mask after
//! clamping the thresholds into a usable range. Returns a binary image
//! where white pixels (255) are edges and black pixels (0) are
//! background.

use crate::canny;
use crate::types::GrayImage;

/// Minimum allowed Canny threshold.
///
/// A threshold of zero turns every pixel with any gradient into an
/// edge, and on a binary mask that floods the contour stage with
/// spurious borders.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Detect edges using hysteresis thresholding on gradient magnitude.
///
/// Both thresholds are clamped to at least [`MIN_THRESHOLD`] and
/// `low_threshold` is clamped to at most `high_threshold`. Non-finite
/// thresholds fall back to [`MIN_THRESHOLD`].
///
/// Edges are one pixel wide and may lie on the outermost pixel ring, so
/// a mask region cut off by the image border is still outlined there.
///
/// This is stage 4 of the pipeline, between closing and contour tracing.
#[must_use = "returns the binary edge map"]
pub fn detect_edges(
    image: &GrayImage,
    low_threshold: f32,
    high_threshold: f32,
    l2_gradient: bool,
) -> GrayImage {
    let high = sanitize(high_threshold);
    let low = sanitize(low_threshold).min(high);
    canny::canny(image, low, high, l2_gradient)
}

fn sanitize(threshold: f32) -> f32 {
    if threshold.is_finite() {
        threshold.max(MIN_THRESHOLD)
    } else {
        MIN_THRESHOLD
    }
}

/// Fraction of pixels marked as edges, in `0.0..=1.0`.
#[must_use]
pub fn edge_density(edges: &GrayImage) -> f64 {
    let total = u64::from(edges.width()) * u64::from(edges.height());
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = crate::threshold::count_foreground(edges) as f64 / total as f64;
    ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 mask with a filled 255 block at x >= 10.
    fn half_mask() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn blank_mask_produces_no_edges() {
        let img = GrayImage::new(20, 20);
        let edges = detect_edges(&img, 50.0, 150.0, false);
        assert_eq!(edges.dimensions(), (20, 20));
        assert!(edge_density(&edges).abs() < f64::EPSILON);
    }

    #[test]
    fn mask_boundary_detected() {
        let edges = detect_edges(&half_mask(), 50.0, 150.0, false);
        assert!(edge_density(&edges) > 0.0);
    }

    #[test]
    fn mask_boundary_reaches_the_image_border() {
        let edges = detect_edges(&half_mask(), 50.0, 150.0, false);
        for y in [0, 19] {
            assert_eq!(edges.get_pixel(9, y).0[0], 255, "row {y}");
            assert_eq!(edges.get_pixel(10, y).0[0], 0, "row {y}");
        }
        assert!((edge_density(&edges) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn zero_low_threshold_is_clamped_to_min() {
        let img = half_mask();
        assert_eq!(
            detect_edges(&img, 0.0, 150.0, false),
            detect_edges(&img, MIN_THRESHOLD, 150.0, false),
        );
    }

    #[test]
    fn low_above_high_is_clamped() {
        let img = half_mask();
        assert_eq!(
            detect_edges(&img, 200.0, 100.0, false),
            detect_edges(&img, 100.0, 100.0, false),
        );
    }

    #[test]
    fn nan_threshold_falls_back_to_min() {
        let img = half_mask();
        assert_eq!(
            detect_edges(&img, f32::NAN, 150.0, false),
            detect_edges(&img, MIN_THRESHOLD, 150.0, false),
        );
    }

    #[test]
    fn density_of_empty_image_is_zero() {
        assert!(edge_density(&GrayImage::new(0, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn density_counts_marked_pixels() {
        let mut img = GrayImage::new(4, 5);
        img.put_pixel(0, 0, image::Luma([255]));
        img.put_pixel(3, 4, image::Luma([255]));
        assert!((edge_density(&img) - 0.1).abs() < 1e-12);
    }
}
