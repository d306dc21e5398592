//! Gaussian smoothing for noise suppression before binarization.
//!
//! A fixed-size separable kernel (default 5x5) with edge replication at
//! the borders. See [`crate::kernel`] for the weights and the border
//! policy.

use crate::kernel;
use crate::types::GrayImage;

/// Smooth an intensity image with a `kernel_size` x `kernel_size`
/// Gaussian kernel.
///
/// The weights depend only on the kernel size (see
/// [`kernel::gaussian_weights`]); the default 5x5 kernel is the
/// binomial `[1, 4, 6, 4, 1] / 16` in each direction.
/// A kernel size of 0 or 1 returns the image unchanged; even sizes are
/// rounded up to the next odd size.
///
/// This is the second half of stage 1, right after grayscale conversion.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, kernel_size: u32) -> GrayImage {
    if kernel_size <= 1 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let weights = kernel::gaussian_weights(kernel_size);
    let sums = kernel::convolve_replicate(image, &weights);
    let width = image.width() as usize;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        image::Luma([kernel::round_weighted(
            sums[y as usize * width + x as usize],
        )])
    })
}
