use crate::utils::error::DermaError;
use crate::Result;
use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageFormat};

const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

pub struct ImageLoader;

impl ImageLoader {
    /// Load an image from a base64 string, tolerating a data-URL prefix
    pub fn from_base64(base64_data: &str) -> Result<DynamicImage> {
        let base64_clean = if base64_data.starts_with("data:") {
            base64_data.split(',').nth(1).unwrap_or(base64_data)
        } else {
            base64_data
        };

        let image_bytes = base64::engine::general_purpose::STANDARD
            .decode(base64_clean)
            .map_err(DermaError::Base64)?;

        Self::from_bytes(&image_bytes)
    }

    /// Load an image from raw bytes (multipart upload path)
    pub fn from_bytes(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(DermaError::FileTooLarge(bytes.len(), MAX_IMAGE_BYTES));
        }

        let format = image::guess_format(bytes).map_err(DermaError::ImageDecode)?;
        if !Self::is_supported_format(format) {
            return Err(DermaError::UnsupportedFormat(format!("{:?}", format)));
        }

        let image = image::load_from_memory(bytes).map_err(DermaError::ImageDecode)?;

        Ok(image)
    }

    /// Load an image from a filesystem path (annotated-artifact re-read)
    pub fn from_path(path: &std::path::Path) -> Result<DynamicImage> {
        let image = image::open(path).map_err(DermaError::ImageDecode)?;

        Ok(image)
    }

    /// Only JPEG and PNG uploads are accepted
    pub fn is_supported_format(format: ImageFormat) -> bool {
        matches!(format, ImageFormat::Png | ImageFormat::Jpeg)
    }

    /// Reject degenerate or absurdly large rasters before preprocessing
    pub fn validate_dimensions(image: &DynamicImage) -> Result<()> {
        let (width, height) = image.dimensions();

        if width < 16 || height < 16 {
            return Err(DermaError::InvalidInput(format!(
                "Image too small: {}x{}, minimum 16x16",
                width, height
            )));
        }

        if width > 8192 || height > 8192 {
            return Err(DermaError::InvalidInput(format!(
                "Image too large: {}x{}, maximum 8192x8192",
                width, height
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img.clone())
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn png_round_trip_preserves_dimensions() {
        let img = RgbImage::new(32, 48);
        let decoded = ImageLoader::from_bytes(&encode_png(&img)).unwrap();
        assert_eq!(decoded.dimensions(), (32, 48));
    }

    #[test]
    fn base64_with_data_url_prefix_decodes() {
        let img = RgbImage::new(20, 20);
        let b64 = base64::engine::general_purpose::STANDARD.encode(encode_png(&img));
        let data_url = format!("data:image/png;base64,{}", b64);
        let decoded = ImageLoader::from_base64(&data_url).unwrap();
        assert_eq!(decoded.dimensions(), (20, 20));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = ImageLoader::from_bytes(&[0u8; 64]).unwrap_err();
        assert!(matches!(
            err,
            DermaError::ImageDecode(_) | DermaError::UnsupportedFormat(_)
        ));
    }

    #[test]
    fn tiny_images_fail_validation() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        assert!(ImageLoader::validate_dimensions(&img).is_err());
    }

    #[test]
    fn gif_format_is_unsupported() {
        assert!(!ImageLoader::is_supported_format(ImageFormat::Gif));
        assert!(ImageLoader::is_supported_format(ImageFormat::Jpeg));
    }
}
