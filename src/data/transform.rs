//! Fixed image preprocessing.
//!
//! Every image goes through the same transform before encoding: resize
//! to a square, force RGB, scale to `[0, 1]`, then channel-wise
//! normalization with the encoder's training statistics.

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array3;

/// Default edge length expected by the encoders.
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Channel means the encoders were trained with.
pub const DEFAULT_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Channel standard deviations the encoders were trained with.
pub const DEFAULT_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resize + RGB conversion + channel-wise normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageTransform {
    pub size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self {
            size: DEFAULT_IMAGE_SIZE,
            mean: DEFAULT_MEAN,
            std: DEFAULT_STD,
        }
    }
}

impl ImageTransform {
    /// Transform with the default statistics at a custom edge length.
    pub fn with_size(size: u32) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Apply the transform, producing a `[3, size, size]` tensor.
    ///
    /// Non-RGB inputs (grayscale, RGBA, palette) are converted to RGB
    /// first; resizing uses bilinear filtering.
    pub fn apply(&self, image: &DynamicImage) -> Array3<f32> {
        let rgb = image.to_rgb8();
        let resized = if rgb.dimensions() == (self.size, self.size) {
            rgb
        } else {
            image::imageops::resize(&rgb, self.size, self.size, FilterType::Triangle)
        };

        let size = self.size as usize;
        let mut out = Array3::<f32>::zeros((3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let scaled = pixel[c] as f32 / 255.0;
                out[[c, y as usize, x as usize]] = (scaled - self.mean[c]) / self.std[c];
            }
        }
        out
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::{Rgb, RgbImage};

    #[test]
    fn output_shape_is_chw() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(10, 6));
        let out = ImageTransform::with_size(8).apply(&img);
        assert_eq!(out.dim(), (3, 8, 8));
    }

    #[test]
    fn normalization_uses_channel_stats() {
        // A uniform mid-gray image: every channel value is 128/255.
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([128, 128, 128])));
        let transform = ImageTransform::with_size(4);
        let out = transform.apply(&img);

        for c in 0..3 {
            let expected = (128.0 / 255.0 - transform.mean[c]) / transform.std[c];
            assert_abs_diff_eq!(out[[c, 0, 0]], expected, epsilon = 1e-6);
            assert_abs_diff_eq!(out[[c, 3, 3]], expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn grayscale_is_converted_to_rgb() {
        let gray = image::GrayImage::from_pixel(5, 5, image::Luma([200]));
        let out = ImageTransform::with_size(5).apply(&DynamicImage::ImageLuma8(gray));
        // All three channels carry the replicated gray value.
        let t = ImageTransform::with_size(5);
        for c in 0..3 {
            let expected = (200.0 / 255.0 - t.mean[c]) / t.std[c];
            assert_abs_diff_eq!(out[[c, 2, 2]], expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn already_sized_image_skips_resize() {
        let mut img = RgbImage::new(4, 4);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        let out = ImageTransform::with_size(4).apply(&DynamicImage::ImageRgb8(img));
        let t = ImageTransform::with_size(4);
        assert_abs_diff_eq!(
            out[[0, 0, 0]],
            (1.0 - t.mean[0]) / t.std[0],
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(out[[1, 0, 0]], (0.0 - t.mean[1]) / t.std[1], epsilon = 1e-6);
    }
}
