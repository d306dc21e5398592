//! Canny edge detection over an already-smoothed intensity image.
//!
//! Adapted from `imageproc::edges::canny` (0.26) with these changes:
//!
//! - No internal Gaussian blur. The pipeline smooths and binarizes
//!   before edge extraction, so a second blur would only shift edges.
//! - Gradient magnitude is L1 (`|gx| + |gy|`) unless `l2_gradient` is
//!   set, in which case it is the Euclidean norm.
//! - Hysteresis visits all 8 neighbors and bounds-checks every neighbor
//!   coordinate, so tracing into the image border cannot underflow.
//!   (<https://github.com/image-rs/imageproc/issues/705>)
//! - Non-maximum suppression runs on every pixel, border included, with
//!   magnitudes outside the image read as zero. A plateau along the
//!   gradient keeps only its first pixel, so step edges are one pixel
//!   wide.
//! - No `unsafe` pixel access and no `unreachable!`.

use image::Luma;
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

use crate::threshold::{BACKGROUND, FOREGROUND};
use crate::types::GrayImage;

/// Quantized gradient direction, in degrees from the positive x axis
/// (y pointing down).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Deg0,
    Deg45,
    Deg90,
    Deg135,
}

impl Direction {
    fn quantize(gx: f32, gy: f32) -> Self {
        let mut angle = gy.atan2(gx).to_degrees();
        if angle < 0.0 {
            angle += 180.0;
        }
        if (22.5..67.5).contains(&angle) {
            Self::Deg45
        } else if (67.5..112.5).contains(&angle) {
            Self::Deg90
        } else if (112.5..157.5).contains(&angle) {
            Self::Deg135
        } else {
            Self::Deg0
        }
    }

    /// The two neighbors of `(x, y)` along the gradient. The first one
    /// must be strictly smaller for `(x, y)` to survive suppression.
    const fn neighbors(self, x: i64, y: i64) -> [(i64, i64); 2] {
        match self {
            Self::Deg0 => [(x - 1, y), (x + 1, y)],
            Self::Deg45 => [(x + 1, y + 1), (x - 1, y - 1)],
            Self::Deg90 => [(x, y - 1), (x, y + 1)],
            Self::Deg135 => [(x - 1, y + 1), (x + 1, y - 1)],
        }
    }
}

/// Run Canny edge detection on `image`.
///
/// Pixels with a thinned gradient magnitude at or above
/// `high_threshold` seed edges; pixels at or above `low_threshold` join
/// an edge when 8-connected to one. Returns a binary image with edges
/// at 255 and background at 0. Gradients at the border are computed
/// from replicated edge pixels, so an edge running off the image keeps
/// its border segment.
#[must_use = "returns the binary edge map"]
pub fn canny(
    image: &GrayImage,
    low_threshold: f32,
    high_threshold: f32,
    l2_gradient: bool,
) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);

    let magnitude = Image::from_fn(width, height, |x, y| {
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        if l2_gradient {
            Luma([h.hypot(v)])
        } else {
            Luma([h.abs() + v.abs()])
        }
    });

    let thinned = non_maximum_suppression(&magnitude, &gx, &gy);
    hysteresis(&thinned, low_threshold, high_threshold)
}

/// Zero every pixel that is not a local maximum along its gradient.
fn non_maximum_suppression(
    magnitude: &Image<Luma<f32>>,
    gx: &Image<Luma<i16>>,
    gy: &Image<Luma<i16>>,
) -> Image<Luma<f32>> {
    let (width, height) = magnitude.dimensions();
    let mut out = Image::from_pixel(width, height, Luma([0.0f32]));
    for y in 0..height {
        for x in 0..width {
            let direction = Direction::quantize(
                f32::from(gx.get_pixel(x, y).0[0]),
                f32::from(gy.get_pixel(x, y).0[0]),
            );
            let value = magnitude.get_pixel(x, y).0[0];
            let [before, after] = direction.neighbors(i64::from(x), i64::from(y));
            if value > magnitude_at(magnitude, before) && value >= magnitude_at(magnitude, after) {
                out.put_pixel(x, y, Luma([value]));
            }
        }
    }
    out
}

/// Gradient magnitude at `(x, y)`, zero outside the image.
fn magnitude_at(magnitude: &Image<Luma<f32>>, (x, y): (i64, i64)) -> f32 {
    match (u32::try_from(x), u32::try_from(y)) {
        (Ok(x), Ok(y)) if x < magnitude.width() && y < magnitude.height() => {
            magnitude.get_pixel(x, y).0[0]
        }
        _ => 0.0,
    }
}

/// Depth-first edge tracking from strong pixels through weak ones.
fn hysteresis(input: &Image<Luma<f32>>, low: f32, high: f32) -> GrayImage {
    let (width, height) = input.dimensions();
    let mut out = GrayImage::from_pixel(width, height, Luma([BACKGROUND]));
    let mut stack = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if input.get_pixel(x, y).0[0] < high || out.get_pixel(x, y).0[0] != BACKGROUND {
                continue;
            }
            out.put_pixel(x, y, Luma([FOREGROUND]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (nx, ny) in neighbors8(cx, cy, width, height) {
                    if input.get_pixel(nx, ny).0[0] >= low
                        && out.get_pixel(nx, ny).0[0] == BACKGROUND
                    {
                        out.put_pixel(nx, ny, Luma([FOREGROUND]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

/// In-bounds 8-connected neighbors of `(x, y)`.
fn neighbors8(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    const OFFSETS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];
    OFFSETS.into_iter().filter_map(move |(dx, dy)| {
        let nx = u32::try_from(i64::from(x) + dx).ok()?;
        let ny = u32::try_from(i64::from(y) + dy).ok()?;
        (nx < width && ny < height).then_some((nx, ny))
    })
}
