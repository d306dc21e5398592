//! Binary morphology with a square structuring element.
//!
//! Pixels are treated as binary with threshold `> 0`; outputs are 0 or
//! 255. Out-of-bounds pixels never contribute: dilation treats them as
//! background and erosion as foreground. With that convention dilation
//! and erosion form an adjoint pair, so [`close`] is idempotent.
//!
//! A square element is separable, so every operation is a horizontal
//! sweep followed by a vertical sweep.

use std::ops::Range;

use crate::threshold::{BACKGROUND, FOREGROUND};
use crate::types::GrayImage;

#[derive(Debug, Clone, Copy)]
enum Sweep {
    /// Any foreground pixel in the window (dilation).
    Any,
    /// All pixels in the window are foreground (erosion).
    All,
}

impl Sweep {
    fn reduce<I: Iterator<Item = bool>>(self, mut window: I) -> bool {
        match self {
            Self::Any => window.any(|set| set),
            Self::All => window.all(|set| set),
        }
    }
}

/// Window `[i - radius, i + radius]` clipped to `0..len`.
fn window(i: u32, radius: u32, len: u32) -> Range<u32> {
    i.saturating_sub(radius)..i.saturating_add(radius).saturating_add(1).min(len)
}

fn sweep(mask: &GrayImage, kernel_size: u32, op: Sweep) -> GrayImage {
    let (width, height) = mask.dimensions();
    let radius = kernel_size / 2;
    if radius == 0 || width == 0 || height == 0 {
        return binarize(mask);
    }

    let row = width as usize;
    let mut horizontal = Vec::with_capacity(row * height as usize);
    for y in 0..height {
        for x in 0..width {
            let window = window(x, radius, width).map(|sx| mask.get_pixel(sx, y).0[0] > 0);
            horizontal.push(op.reduce(window));
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let set = op.reduce(
            window(y, radius, height).map(|sy| horizontal[sy as usize * row + x as usize]),
        );
        image::Luma([if set { FOREGROUND } else { BACKGROUND }])
    })
}

fn binarize(mask: &GrayImage) -> GrayImage {
    GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        image::Luma([if mask.get_pixel(x, y).0[0] > 0 {
            FOREGROUND
        } else {
            BACKGROUND
        }])
    })
}

/// Dilate with a `kernel_size` x `kernel_size` square.
#[must_use = "returns the dilated mask"]
pub fn dilate(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    sweep(mask, kernel_size, Sweep::Any)
}

/// Erode with a `kernel_size` x `kernel_size` square.
#[must_use = "returns the eroded mask"]
pub fn erode(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    sweep(mask, kernel_size, Sweep::All)
}

/// Morphological closing: dilation followed by erosion with the same
/// square element.
///
/// Bridges gaps narrower than the element between nearby foreground
/// regions without growing them overall. A kernel size of 0 or 1 only
/// normalizes the mask to 0/255.
///
/// This is stage 3 of the pipeline, between binarization and edge
/// extraction.
#[must_use = "returns the closed mask"]
pub fn close(mask: &GrayImage, kernel_size: u32) -> GrayImage {
    erode(&dilate(mask, kernel_size), kernel_size)
}
