//! Contour overlay.
//!
//! Contours are stroked into a `tiny-skia` coverage mask without
//! anti-aliasing, and every covered pixel of the color buffer is
//! overwritten with the highlight color. Pixels outside the strokes are
//! left untouched.

use image::Rgb;
use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::types::{Contour, Point, RgbImage};

/// Draw `contours` onto `image` and hand the buffer back.
///
/// Each contour is stroked as a closed polyline (the last vertex joins
/// the first) with round caps and joins. A single-point contour is drawn
/// as a dot of diameter `stroke_width`. Coordinates address pixel
/// centers. `color` is in RGB order.
///
/// With no contours, or a non-positive stroke width, the buffer is
/// returned unchanged.
///
/// This is the last stage of the pipeline.
#[must_use = "returns the annotated image"]
pub fn draw_contours(
    mut image: RgbImage,
    contours: &[Contour],
    color: [u8; 3],
    stroke_width: f32,
) -> RgbImage {
    if contours.is_empty() || stroke_width.is_nan() || stroke_width <= 0.0 {
        return image;
    }
    let Some(mask) = coverage(image.width(), image.height(), contours, stroke_width) else {
        return image;
    };

    for (pixel, covered) in image.pixels_mut().zip(mask.pixels()) {
        if covered.alpha() > 0 {
            *pixel = Rgb(color);
        }
    }
    image
}

/// Rasterize all contours into a single-color, aliased mask.
fn coverage(width: u32, height: u32, contours: &[Contour], stroke_width: f32) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)?;

    let mut paint = Paint::default();
    paint.set_color_rgba8(255, 255, 255, 255);
    paint.anti_alias = false;

    let stroke = Stroke {
        width: stroke_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    let mut pb = PathBuilder::new();
    for contour in contours {
        match contour.points() {
            [] => {}
            [dot] => {
                let (cx, cy) = pixel_center(*dot);
                if let Some(circle) = PathBuilder::from_circle(cx, cy, stroke_width / 2.0) {
                    pixmap.fill_path(
                        &circle,
                        &paint,
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }
            [first, rest @ ..] => {
                let (x, y) = pixel_center(*first);
                pb.move_to(x, y);
                for p in rest {
                    let (x, y) = pixel_center(*p);
                    pb.line_to(x, y);
                }
                pb.close();
            }
        }
    }

    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    Some(pixmap)
}

#[allow(clippy::cast_precision_loss)]
fn pixel_center(p: Point) -> (f32, f32) {
    (p.x as f32 + 0.5, p.y as f32 + 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 3] = [255, 0, 0];

    fn contour(coords: &[(u32, u32)]) -> Contour {
        Contour::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect(), false)
    }

    fn gray_canvas() -> RgbImage {
        RgbImage::from_pixel(20, 20, Rgb([90, 90, 90]))
    }

    #[test]
    fn no_contours_leaves_image_identical() {
        let img = gray_canvas();
        assert_eq!(draw_contours(img.clone(), &[], RED, 2.0), img);
    }

    #[test]
    fn zero_width_stroke_draws_nothing() {
        let img = gray_canvas();
        let c = contour(&[(2, 5), (17, 5)]);
        assert_eq!(draw_contours(img.clone(), &[c], RED, 0.0), img);
    }

    #[test]
    fn segment_is_drawn_with_exact_color() {
        let c = contour(&[(2, 5), (17, 5)]);
        let out = draw_contours(gray_canvas(), &[c], RED, 2.0);
        assert_eq!(out.dimensions(), (20, 20));
        assert_eq!(*out.get_pixel(10, 5), Rgb(RED));
        assert_eq!(*out.get_pixel(10, 15), Rgb([90, 90, 90]));
        assert_eq!(*out.get_pixel(10, 0), Rgb([90, 90, 90]));
    }

    #[test]
    fn pixels_are_overwritten_not_blended() {
        let c = contour(&[(3, 3), (16, 3), (16, 16), (3, 16)]);
        let out = draw_contours(gray_canvas(), &[c], RED, 2.0);
        for p in out.pixels() {
            assert!(*p == Rgb(RED) || *p == Rgb([90, 90, 90]), "blended pixel {p:?}");
        }
    }

    #[test]
    fn polyline_is_closed() {
        // Only the closing segment crosses the diagonal interior.
        let c = contour(&[(2, 2), (15, 2), (15, 15)]);
        let out = draw_contours(gray_canvas(), &[c], RED, 2.0);
        assert_eq!(*out.get_pixel(8, 8), Rgb(RED));
    }

    #[test]
    fn single_point_draws_a_dot() {
        let c = contour(&[(5, 5)]);
        let out = draw_contours(gray_canvas(), &[c], RED, 2.0);
        assert_eq!(*out.get_pixel(5, 5), Rgb(RED));
        assert_eq!(*out.get_pixel(12, 12), Rgb([90, 90, 90]));
    }

    #[test]
    fn color_channels_are_rgb_ordered() {
        let c = contour(&[(2, 5), (17, 5)]);
        let out = draw_contours(gray_canvas(), &[c], [0, 0, 255], 2.0);
        assert_eq!(*out.get_pixel(10, 5), Rgb([0, 0, 255]));
    }
}
