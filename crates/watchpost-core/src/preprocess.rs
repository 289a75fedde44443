//! Letterbox resize and NCHW tensor packing shared by the ONNX models.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

/// Geometry of an aspect-preserving resize into a square model input.
///
/// Keeps what is needed to map model-space coordinates back to the
/// source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Side of the square model input.
    pub target: u32,
    pub scale: f32,
    /// Size of the resized content inside the square.
    pub content_width: u32,
    pub content_height: u32,
    /// Offset of the content's top-left corner.
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    /// Fit a `width` x `height` image into a `target` x `target` square, centered.
    pub fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width.max(1) as f32).min(target as f32 / height.max(1) as f32);
        let content_width = ((width as f32 * scale).round() as u32).clamp(1, target);
        let content_height = ((height as f32 * scale).round() as u32).clamp(1, target);

        Self {
            target,
            scale,
            content_width,
            content_height,
            pad_x: (target - content_width) / 2,
            pad_y: (target - content_height) / 2,
        }
    }

    /// Resize `image` (bilinear) and paste it onto a `fill`-colored square canvas.
    pub fn apply(&self, image: &RgbImage, fill: Rgb<u8>) -> RgbImage {
        let resized = imageops::resize(
            image,
            self.content_width,
            self.content_height,
            FilterType::Triangle,
        );
        let mut canvas = RgbImage::from_pixel(self.target, self.target, fill);
        imageops::replace(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);
        canvas
    }

    /// Map a point from model-input space back to source-image space.
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }
}

/// Pack an RGB image into a `[1, 3, H, W]` float tensor, `(pixel - mean) / std`.
pub fn to_nchw(image: &RgbImage, mean: f32, std: f32) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for (c, &value) in pixel.0.iter().enumerate() {
            tensor[[0, c, y as usize, x as usize]] = (value as f32 - mean) / std;
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_landscape() {
        let lb = Letterbox::fit(320, 240, 640);
        assert!((lb.scale - 2.0).abs() < 1e-6);
        assert_eq!((lb.content_width, lb.content_height), (640, 480));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 80));
    }

    #[test]
    fn test_fit_portrait() {
        let lb = Letterbox::fit(100, 200, 640);
        assert_eq!((lb.content_width, lb.content_height), (320, 640));
        assert_eq!((lb.pad_x, lb.pad_y), (160, 0));
    }

    #[test]
    fn test_coordinate_roundtrip() {
        let lb = Letterbox::fit(320, 240, 640);
        let (orig_x, orig_y) = (100.0f32, 50.0f32);
        let boxed_x = orig_x * lb.scale + lb.pad_x as f32;
        let boxed_y = orig_y * lb.scale + lb.pad_y as f32;

        let (x, y) = lb.to_source(boxed_x, boxed_y);
        assert!((x - orig_x).abs() < 0.1, "x: {x} vs {orig_x}");
        assert!((y - orig_y).abs() < 0.1, "y: {y} vs {orig_y}");
    }

    #[test]
    fn test_apply_pads_with_fill() {
        let image = RgbImage::from_pixel(32, 16, Rgb([200, 10, 10]));
        let lb = Letterbox::fit(32, 16, 64);
        let canvas = lb.apply(&image, Rgb([114, 114, 114]));

        assert_eq!(canvas.dimensions(), (64, 64));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([114, 114, 114]));
        assert_eq!(canvas.get_pixel(32, 32), &Rgb([200, 10, 10]));
    }

    #[test]
    fn test_to_nchw_layout_and_normalization() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(1, 0, Rgb([255, 0, 51]));
        let tensor = to_nchw(&image, 0.0, 255.0);

        assert_eq!(tensor.shape(), &[1, 3, 1, 2]);
        assert_eq!(tensor[[0, 0, 0, 1]], 1.0);
        assert_eq!(tensor[[0, 1, 0, 1]], 0.0);
        assert!((tensor[[0, 2, 0, 1]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
    }
}
