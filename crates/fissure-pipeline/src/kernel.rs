//! Integer Gaussian kernels and clamp-to-edge separable convolution.
//!
//! Shared by the smoothing and adaptive threshold stages. Weights are
//! integers summing to exactly [`WEIGHT_SCALE`], and the convolution
//! returns the exact weighted sums (scale `WEIGHT_SCALE²`). Rounding
//! happens once, in [`round_weighted`], so a uniform shift of the input
//! by `k` shifts every rounded result by exactly `k`.
//!
//! Borders use edge replication: coordinates outside the image are
//! clamped to the nearest valid row or column.

use crate::types::GrayImage;

/// Sum of the weights of every 1D kernel.
pub const WEIGHT_SCALE: u32 = 1 << 12;

/// Sum of the weights of the 2D (outer product) kernel.
const WEIGHT_SCALE_2D: u64 = (WEIGHT_SCALE as u64) * (WEIGHT_SCALE as u64);

/// Gaussian sigma used for a sampled kernel of the given side length:
/// `0.3 * ((size - 1) / 2 - 1) + 0.8`.
///
/// Only kernels wider than 7 are sampled; see [`gaussian_weights`].
#[must_use]
pub fn sigma_for_size(size: u32) -> f64 {
    0.3f64.mul_add((f64::from(size) - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Binomial weights for sizes up to 7, scaled to [`WEIGHT_SCALE`]
/// (`[1, 2, 1] / 4`, `[1, 4, 6, 4, 1] / 16`, and the fixed 7-tap table).
const SMALL_KERNELS: [&[u32]; 4] = [
    &[4096],
    &[1024, 2048, 1024],
    &[256, 1024, 1536, 1024, 256],
    &[128, 448, 896, 1152, 896, 448, 128],
];

/// Symmetric 1D Gaussian weights of length `size` summing to [`WEIGHT_SCALE`].
///
/// Sizes 1 through 7 use the fixed [`SMALL_KERNELS`] tables. Larger
/// sizes sample a Gaussian with [`sigma_for_size`]; off-center weights
/// are floored and the center absorbs the remainder, which keeps the
/// kernel symmetric and every weight non-negative.
/// `size` must be odd; even sizes are rounded up to the next odd size.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
pub fn gaussian_weights(size: u32) -> Vec<u32> {
    let size = size.max(1) | 1;
    if let Some(table) = SMALL_KERNELS.get((size / 2) as usize) {
        return table.to_vec();
    }
    let radius = i64::from(size / 2);
    let sigma = sigma_for_size(size);
    let denom = 2.0 * sigma * sigma;

    let raw: Vec<f64> = (-radius..=radius)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let d = i as f64;
            (-(d * d) / denom).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();

    let mut weights: Vec<u32> = raw
        .iter()
        .map(|w| (w / total * f64::from(WEIGHT_SCALE)).floor() as u32)
        .collect();
    let center = radius as usize;
    weights[center] = 0;
    let off_center: u32 = weights.iter().sum();
    weights[center] = WEIGHT_SCALE - off_center;
    weights
}

/// Map a possibly out-of-range coordinate onto `0..len` by clamping.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_index(i: i64, len: u32) -> u32 {
    i.clamp(0, i64::from(len) - 1) as u32
}

/// Convolve `image` with the outer product of `weights` with itself.
///
/// Returns one exact weighted sum per pixel, row-major. Each sum is in
/// units of `1 / WEIGHT_SCALE²`; pass it to [`round_weighted`] to get a
/// pixel value back.
#[must_use]
pub fn convolve_replicate(image: &GrayImage, weights: &[u32]) -> Vec<u64> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || weights.is_empty() {
        return Vec::new();
    }
    let radius = i64::try_from(weights.len() / 2).unwrap_or(0);

    // Horizontal pass: one u32 sum per pixel (at most 255 * WEIGHT_SCALE).
    let mut horizontal = Vec::with_capacity(pixel_len(width, height));
    for y in 0..height {
        for x in 0..width {
            let sum: u32 = weights
                .iter()
                .zip(-radius..=radius)
                .map(|(&w, offset)| {
                    let sx = clamp_index(i64::from(x) + offset, width);
                    w * u32::from(image.get_pixel(sx, y).0[0])
                })
                .sum();
            horizontal.push(sum);
        }
    }

    // Vertical pass over the horizontal sums.
    let row = width as usize;
    let mut out = Vec::with_capacity(horizontal.len());
    for y in 0..height {
        for x in 0..width {
            let sum: u64 = weights
                .iter()
                .zip(-radius..=radius)
                .map(|(&w, offset)| {
                    let sy = clamp_index(i64::from(y) + offset, height) as usize;
                    u64::from(w) * u64::from(horizontal[sy * row + x as usize])
                })
                .sum();
            out.push(sum);
        }
    }
    out
}

/// Round an exact weighted sum from [`convolve_replicate`] to a pixel value.
#[must_use]
pub fn round_weighted(sum: u64) -> u8 {
    let rounded = (sum + WEIGHT_SCALE_2D / 2) / WEIGHT_SCALE_2D;
    u8::try_from(rounded).unwrap_or(u8::MAX)
}

fn pixel_len(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigma_matches_conventional_values() {
        assert!((sigma_for_size(5) - 1.1).abs() < 1e-9);
        assert!((sigma_for_size(11) - 2.0).abs() < 1e-9);
        assert!((sigma_for_size(3) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn weights_sum_to_scale_and_are_symmetric() {
        for size in [1, 3, 5, 7, 11, 21, 51] {
            let w = gaussian_weights(size);
            assert_eq!(w.len(), size as usize);
            assert_eq!(w.iter().sum::<u32>(), WEIGHT_SCALE, "size {size}");
            for i in 0..w.len() / 2 {
                assert_eq!(w[i], w[w.len() - 1 - i], "size {size} asymmetric at {i}");
            }
        }
    }

    #[test]
    fn small_sizes_use_binomial_tables() {
        assert_eq!(gaussian_weights(3), [1024, 2048, 1024]);
        assert_eq!(gaussian_weights(5), [256, 1024, 1536, 1024, 256]);
        assert_eq!(gaussian_weights(6), gaussian_weights(7));
    }

    #[test]
    fn large_sizes_sample_the_sigma_formula() {
        let w = gaussian_weights(9);
        let sigma = sigma_for_size(9);
        let ratio = f64::from(w[0]) / f64::from(w[4]);
        let expected = (-16.0 / (2.0 * sigma * sigma)).exp();
        assert!((ratio - expected).abs() < 0.01, "{ratio} vs {expected}");
    }

    #[test]
    fn weights_peak_at_center() {
        let w = gaussian_weights(11);
        let center = w[5];
        assert!(w.iter().all(|&v| v <= center));
        assert!(w[0] < w[4]);
    }

    #[test]
    fn even_size_rounds_up() {
        assert_eq!(gaussian_weights(4).len(), 5);
        assert_eq!(gaussian_weights(0).len(), 1);
    }

    #[test]
    fn uniform_image_convolves_to_itself() {
        let img = GrayImage::from_pixel(9, 6, image::Luma([77]));
        let sums = convolve_replicate(&img, &gaussian_weights(5));
        assert_eq!(sums.len(), 54);
        assert!(sums.iter().all(|&s| round_weighted(s) == 77));
    }

    #[test]
    fn identity_kernel_is_exact() {
        #[allow(clippy::cast_possible_truncation)]
        let img = GrayImage::from_fn(5, 4, |x, y| image::Luma([(x * 40 + y * 3) as u8]));
        let sums = convolve_replicate(&img, &gaussian_weights(1));
        for (i, p) in img.pixels().enumerate() {
            assert_eq!(round_weighted(sums[i]), p.0[0]);
        }
    }

    #[test]
    fn clamp_index_replicates_edges() {
        assert_eq!(clamp_index(-3, 5), 0);
        assert_eq!(clamp_index(0, 5), 0);
        assert_eq!(clamp_index(4, 5), 4);
        assert_eq!(clamp_index(9, 5), 4);
    }

    #[test]
    fn empty_image_yields_no_sums() {
        let img = GrayImage::new(0, 0);
        assert!(convolve_replicate(&img, &gaussian_weights(5)).is_empty());
    }
}
