use image::{imageops::FilterType, DynamicImage, RgbImage};
use ndarray::Array3;

/// Pure image transforms shared by the model adapters. Each step returns a
/// new raster; nothing is mutated in place.
pub struct Preprocessor;

impl Preprocessor {
    /// Stretch to exactly `width`x`height` with no aspect-ratio preservation.
    /// Every backend was trained on square stretched inputs, so letterboxing
    /// would shift the pixel statistics it expects.
    pub fn resize(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
        if image.width() == width && image.height() == height {
            return image.to_rgb8();
        }
        image
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8()
    }

    /// Convert an RGB raster to a CHW f32 tensor scaled into [0,1].
    pub fn to_chw_tensor(image: &RgbImage) -> Array3<f32> {
        let (width, height) = image.dimensions();
        let mut tensor = Array3::<f32>::zeros((3, height as usize, width as usize));

        for (x, y, pixel) in image.enumerate_pixels() {
            for c in 0..3 {
                tensor[[c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }

        tensor
    }

    /// Flatten an RGB raster row-major (HWC) into a [0,1] f32 vector, the
    /// feature layout the tree ensemble was fitted on. 64x64x3 yields 12288.
    pub fn flatten_rgb(image: &RgbImage) -> Vec<f32> {
        image.as_raw().iter().map(|&v| v as f32 / 255.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn resize_hits_exact_target_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(300, 170));
        for (w, h) in [(640, 640), (224, 224), (64, 64)] {
            let resized = Preprocessor::resize(&img, w, h);
            assert_eq!(resized.dimensions(), (w, h));
        }
    }

    #[test]
    fn resize_is_identity_at_target_size() {
        let mut img = RgbImage::new(64, 64);
        img.put_pixel(10, 20, Rgb([200, 100, 50]));
        let resized = Preprocessor::resize(&DynamicImage::ImageRgb8(img.clone()), 64, 64);
        assert_eq!(resized, img);
    }

    #[test]
    fn chw_tensor_is_normalized_and_channel_major() {
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(1, 0, Rgb([255, 0, 51]));
        let tensor = Preprocessor::to_chw_tensor(&img);

        assert_eq!(tensor.dim(), (3, 2, 2));
        assert_eq!(tensor[[0, 0, 1]], 1.0);
        assert_eq!(tensor[[1, 0, 1]], 0.0);
        assert!((tensor[[2, 0, 1]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn flattened_64x64_rgb_has_12288_features() {
        let img = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));
        let features = Preprocessor::flatten_rgb(&img);
        assert_eq!(features.len(), 12288);
        assert!(features.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
