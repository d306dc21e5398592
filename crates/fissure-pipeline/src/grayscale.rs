//! Color to intensity conversion.
//!
//! First stage of the pipeline: a 3-channel color buffer in, a
//! single-channel luminance buffer of the same size out.

use image::Luma;

use crate::types::{Dimensions, GrayImage, PipelineError, RgbImage};

/// Fixed-point Rec. 601 weights, scaled so they sum to `1 << LUMA_SHIFT`.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;
const _: () = assert!(LUMA_R + LUMA_G + LUMA_B == 1 << LUMA_SHIFT);

/// Convert a color buffer to intensity.
///
/// Uses the Rec. 601 luminance formula `0.299*R + 0.587*G + 0.114*B`,
/// evaluated in 14-bit fixed point and rounded to nearest. Gray input
/// pixels (`R == G == B`) map to themselves.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if the buffer has zero
/// width or height.
#[must_use = "returns the intensity image"]
pub fn to_intensity(image: &RgbImage) -> Result<GrayImage, PipelineError> {
    Dimensions::of(image).ensure_nonempty()?;

    Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    }))
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = LUMA_R * u32::from(r) + LUMA_G * u32::from(g) + LUMA_B * u32::from(b);
    let rounded = (weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT;
    u8::try_from(rounded).unwrap_or(u8::MAX)
}
