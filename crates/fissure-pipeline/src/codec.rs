//! In-memory image decoding and encoding.
//!
//! Raw bytes in, [`RgbImage`] out, and back. Everything here works on
//! byte slices; reading and writing files lives in `fissure-io`.
//!
//! Alpha channels are dropped on decode so every image reaches the
//! pipeline as a 3-channel color buffer.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

use crate::types::{PipelineError, RgbImage};

/// File extensions accepted by the pipeline (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// JPEG quality used when re-encoding annotated images.
pub const JPEG_QUALITY: u8 = 95;

/// Returns `true` if `extension` (without the dot) is supported.
#[must_use]
pub fn is_supported_extension(extension: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Map a file extension to the format used to encode it.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedFormat`] if the extension is not
/// in [`SUPPORTED_EXTENSIONS`].
pub fn format_for_extension(extension: &str) -> Result<ImageFormat, PipelineError> {
    if !is_supported_extension(extension) {
        return Err(PipelineError::UnsupportedFormat(extension.to_string()));
    }
    ImageFormat::from_extension(extension)
        .ok_or_else(|| PipelineError::UnsupportedFormat(extension.to_string()))
}

/// Decode raw image bytes into a 3-channel color buffer.
///
/// The format is sniffed from the content, not from any file name.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::Decode`] if the data is not a decodable image.
#[must_use = "returns the decoded color image"]
pub fn decode_color(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes).map_err(PipelineError::Decode)?;
    Ok(img.to_rgb8())
}

/// Encode a color buffer in the given format.
///
/// JPEG output uses [`JPEG_QUALITY`]; other formats use the encoder
/// defaults.
///
/// # Errors
///
/// Returns [`PipelineError::Encode`] if the encoder rejects the buffer.
pub fn encode(image: &RgbImage, format: ImageFormat) -> Result<Vec<u8>, PipelineError> {
    if format == ImageFormat::Jpeg {
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(PipelineError::Encode)?;
        return Ok(buf);
    }

    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, format)
        .map_err(PipelineError::Encode)?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([
                u8::try_from((x * 13) % 256).unwrap(),
                u8::try_from((y * 7) % 256).unwrap(),
                u8::try_from(((x + y) * 5) % 256).unwrap(),
            ])
        })
    }

    #[test]
    fn extensions_are_case_insensitive() {
        for ext in ["png", "PNG", "Jpg", "JPEG", "bmp", "TIF", "tiff"] {
            assert!(is_supported_extension(ext), "{ext} should be supported");
        }
        for ext in ["gif", "webp", "txt", ""] {
            assert!(!is_supported_extension(ext), "{ext} should be rejected");
        }
    }

    #[test]
    fn format_for_extension_maps_all_supported() {
        assert_eq!(format_for_extension("png").unwrap(), ImageFormat::Png);
        assert_eq!(format_for_extension("JPG").unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_for_extension("jpeg").unwrap(), ImageFormat::Jpeg);
        assert_eq!(format_for_extension("bmp").unwrap(), ImageFormat::Bmp);
        assert_eq!(format_for_extension("tif").unwrap(), ImageFormat::Tiff);
        assert_eq!(format_for_extension("TIFF").unwrap(), ImageFormat::Tiff);
    }

    #[test]
    fn format_for_unknown_extension_is_unsupported() {
        assert!(matches!(
            format_for_extension("gif"),
            Err(PipelineError::UnsupportedFormat(ref ext)) if ext == "gif"
        ));
    }

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode_color(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_return_decode_error() {
        let result = decode_color(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn png_round_trip_is_pixel_exact() {
        let img = gradient_image(17, 31);
        let bytes = encode(&img, ImageFormat::Png).unwrap();
        let decoded = decode_color(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (17, 31));
        assert_eq!(decoded.as_raw(), img.as_raw());
    }

    #[test]
    fn lossless_formats_round_trip_exactly() {
        let img = gradient_image(9, 5);
        for format in [ImageFormat::Bmp, ImageFormat::Tiff] {
            let bytes = encode(&img, format).unwrap();
            let decoded = decode_color(&bytes).unwrap();
            assert_eq!(decoded.as_raw(), img.as_raw(), "{format:?} altered pixels");
        }
    }

    #[test]
    fn jpeg_round_trip_preserves_shape() {
        let img = gradient_image(24, 16);
        let bytes = encode(&img, ImageFormat::Jpeg).unwrap();
        let decoded = decode_color(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (24, 16));
        assert_eq!(decoded.as_raw().len(), img.as_raw().len());
    }

    #[test]
    fn rgba_input_is_reduced_to_three_channels() {
        let rgba = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 128]));
        let mut buf = Vec::new();
        image::codecs::png::PngEncoder::new(&mut buf)
            .write_image(rgba.as_raw(), 3, 2, ExtendedColorType::Rgba8)
            .unwrap();

        let decoded = decode_color(&buf).unwrap();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert_eq!(decoded.get_pixel(0, 0).0, [10, 20, 30]);
    }
}
