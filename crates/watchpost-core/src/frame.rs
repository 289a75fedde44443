//! Uploaded image decoding.

use image::{ColorType, RgbImage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty image upload")]
    Empty,
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decode an uploaded image (any format the `image` crate recognizes) into
/// an 8-bit RGB raster, converting from other color models when needed.
pub fn decode_upload(bytes: &[u8]) -> Result<RgbImage, FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::Empty);
    }

    let decoded = image::load_from_memory(bytes)?;
    let color = decoded.color();
    if color != ColorType::Rgb8 {
        tracing::debug!(?color, "converting upload to RGB8");
    }

    let rgb = decoded.into_rgb8();
    tracing::debug!(width = rgb.width(), height = rgb.height(), "decoded upload");
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[test]
    fn test_decode_rgb_png() {
        let bytes = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([1, 2, 3]))),
            ImageFormat::Png,
        );
        let rgb = decode_upload(&bytes).unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn test_decode_converts_rgba() {
        let bytes = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 128]))),
            ImageFormat::Png,
        );
        let rgb = decode_upload(&bytes).unwrap();
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_converts_grayscale() {
        let bytes = encode(
            DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([77]))),
            ImageFormat::Png,
        );
        let rgb = decode_upload(&bytes).unwrap();
        assert_eq!(rgb.get_pixel(0, 1), &Rgb([77, 77, 77]));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode_upload(&[]), Err(FrameError::Empty)));
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_upload(b"definitely not an image").unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)));
    }
}
