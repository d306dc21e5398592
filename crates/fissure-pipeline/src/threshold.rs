//! Adaptive (local) binarization.
//!
//! Each pixel is compared against a Gaussian-weighted mean of its
//! `block_size` x `block_size` neighborhood minus a constant offset.
//! Dark pixels relative to their surroundings become foreground (255);
//! everything else becomes background (0).
//!
//! The local mean is computed in exact integer arithmetic (see
//! [`crate::kernel`]), so adding the same value to every input pixel
//! leaves the mask unchanged as long as nothing saturates.

use crate::kernel;
use crate::types::GrayImage;

/// Foreground value in binary masks.
pub const FOREGROUND: u8 = 255;

/// Background value in binary masks.
pub const BACKGROUND: u8 = 0;

/// Binarize `image` against a per-pixel local threshold.
///
/// A pixel is foreground iff `pixel <= local_mean - offset`. The local
/// window uses edge replication at the borders. `block_size` must be
/// odd and at least 3; smaller values are raised to 3 and even values
/// rounded up.
///
/// This is stage 2 of the pipeline, between smoothing and closing.
#[must_use = "returns the binary mask"]
pub fn adaptive_threshold(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let weights = kernel::gaussian_weights(block_size.max(3));
    let sums = kernel::convolve_replicate(image, &weights);
    let row = width as usize;
    GrayImage::from_fn(width, height, |x, y| {
        let mean = i64::from(kernel::round_weighted(sums[y as usize * row + x as usize]));
        let value = i64::from(image.get_pixel(x, y).0[0]);
        if value - mean + i64::from(offset) <= 0 {
            image::Luma([FOREGROUND])
        } else {
            image::Luma([BACKGROUND])
        }
    })
}

/// Count foreground pixels in a binary mask.
#[must_use]
pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] > 0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mid-gray background with a 2-pixel dark vertical line at x = 10..12.
    #[allow(clippy::cast_possible_truncation)]
    fn dark_line(base: u8) -> GrayImage {
        GrayImage::from_fn(24, 20, |x, _y| {
            if (10..12).contains(&x) {
                image::Luma([base - 40])
            } else {
                image::Luma([base])
            }
        })
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = GrayImage::new(17, 31);
        assert_eq!(adaptive_threshold(&img, 11, 2).dimensions(), (17, 31));
    }

    #[test]
    fn solid_image_is_all_background() {
        for v in [0u8, 90, 255] {
            let img = GrayImage::from_pixel(20, 20, image::Luma([v]));
            let mask = adaptive_threshold(&img, 11, 2);
            assert_eq!(count_foreground(&mask), 0, "level {v} produced foreground");
        }
    }

    #[test]
    fn dark_line_becomes_foreground() {
        let mask = adaptive_threshold(&dark_line(120), 11, 2);
        for y in 0..20 {
            assert_eq!(mask.get_pixel(10, y).0[0], FOREGROUND);
            assert_eq!(mask.get_pixel(11, y).0[0], FOREGROUND);
            assert_eq!(mask.get_pixel(2, y).0[0], BACKGROUND);
            assert_eq!(mask.get_pixel(20, y).0[0], BACKGROUND);
        }
    }

    #[test]
    fn bright_line_stays_background() {
        let img = GrayImage::from_fn(24, 20, |x, _y| {
            if x == 12 {
                image::Luma([200])
            } else {
                image::Luma([100])
            }
        });
        let mask = adaptive_threshold(&img, 11, 2);
        for y in 0..20 {
            assert_eq!(mask.get_pixel(12, y).0[0], BACKGROUND);
        }
        // Far from the line the background is flat.
        assert_eq!(mask.get_pixel(0, 10).0[0], BACKGROUND);
    }

    #[test]
    fn mask_is_invariant_under_brightness_shift() {
        #[allow(clippy::cast_possible_truncation)]
        let textured = GrayImage::from_fn(32, 24, |x, y| {
            image::Luma([60 + ((x * 37 + y * 11 + x * y) % 90) as u8])
        });
        let reference = adaptive_threshold(&textured, 11, 2);

        for shift in [1u8, 17, 60, 100] {
            let shifted = GrayImage::from_fn(32, 24, |x, y| {
                image::Luma([textured.get_pixel(x, y).0[0] + shift])
            });
            assert_eq!(
                adaptive_threshold(&shifted, 11, 2),
                reference,
                "mask changed under +{shift} shift"
            );
        }
    }

    #[test]
    fn locality_beats_global_threshold() {
        // The same dark line on a dark and a bright half: a single global
        // cutoff cannot isolate both, the local one does.
        let img = GrayImage::from_fn(40, 20, |x, _y| {
            let base = if x < 20 { 60 } else { 200 };
            if x == 8 || x == 30 {
                image::Luma([base - 30])
            } else {
                image::Luma([base])
            }
        });
        let mask = adaptive_threshold(&img, 11, 2);
        assert_eq!(mask.get_pixel(8, 10).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(30, 10).0[0], FOREGROUND);
        assert_eq!(mask.get_pixel(3, 10).0[0], BACKGROUND);
        assert_eq!(mask.get_pixel(36, 10).0[0], BACKGROUND);
    }

    #[test]
    fn extreme_offsets_saturate_the_mask() {
        let img = dark_line(120);
        let pixels = u64::from(img.width()) * u64::from(img.height());
        assert_eq!(count_foreground(&adaptive_threshold(&img, 11, i32::MAX)), 0);
        assert_eq!(count_foreground(&adaptive_threshold(&img, 11, i32::MIN)), pixels);
    }

    #[test]
    fn larger_offset_is_stricter() {
        let img = dark_line(120);
        let loose = count_foreground(&adaptive_threshold(&img, 11, 2));
        let strict = count_foreground(&adaptive_threshold(&img, 11, 60));
        assert!(strict <= loose);
        assert_eq!(strict, 0);
    }
}
