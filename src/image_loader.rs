//! Screenshot and design-image handling.
//!
//! Page screenshots arrive from the capture helper as PNG data URIs. Before
//! they go into an analysis payload they are downscaled (half size by default)
//! to keep the request body small. Design references are local image files
//! converted into the same data-URI form.

use std::io::Cursor;
use std::path::Path;

use base64::Engine;
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageError, ImageOutputFormat};
use thiserror::Error;

use crate::data_uri::{DataUri, DataUriError};

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Failed to load image: {0}")]
    Load(#[from] ImageError),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid screenshot data: {0}")]
    DataUri(#[from] DataUriError),
    #[error("Invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Default scale applied to page screenshots before upload.
pub const SCREENSHOT_SCALE: f32 = 0.5;

/// Longest side of a design reference after loading.
pub const DESIGN_IMAGE_MAX_DIM: u32 = 1600;

pub fn load_image(path: &Path) -> Result<DynamicImage, ImageLoadError> {
    if !path.exists() {
        return Err(ImageLoadError::NotFound(path.display().to_string()));
    }
    Ok(image::open(path)?)
}

/// Scales an image by `factor`, never below 1x1.
pub fn scale_image(img: &DynamicImage, factor: f32) -> DynamicImage {
    if (factor - 1.0).abs() < f32::EPSILON {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let new_w = ((w as f32 * factor).round() as u32).max(1);
    let new_h = ((h as f32 * factor).round() as u32).max(1);
    img.resize_exact(new_w, new_h, FilterType::Triangle)
}

/// Shrinks the image so its longest side is at most `max_dim`.
pub fn fit_within(img: &DynamicImage, max_dim: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max_dim && h <= max_dim {
        return img.clone();
    }
    img.resize(max_dim, max_dim, FilterType::Lanczos3)
}

pub fn encode_png_data_uri(img: &DynamicImage) -> Result<String, ImageLoadError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    let data = base64::engine::general_purpose::STANDARD.encode(&buf);
    Ok(DataUri::new("image/png", data).to_string())
}

/// Decodes a screenshot data URI, rescales it and re-encodes it as PNG.
pub fn downscale_data_uri(uri: &str, factor: f32) -> Result<String, ImageLoadError> {
    let parsed: DataUri = uri.parse()?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(parsed.data.as_bytes())?;
    let img = image::load_from_memory(&bytes)?;
    encode_png_data_uri(&scale_image(&img, factor))
}

/// Loads a local design reference and returns it as a PNG data URI.
pub fn design_image_data_uri(path: &Path) -> Result<String, ImageLoadError> {
    let img = load_image(path)?;
    encode_png_data_uri(&fit_within(&img, DESIGN_IMAGE_MAX_DIM))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use tempfile::TempDir;

    #[test]
    fn missing_design_file_is_not_found() {
        let result = design_image_data_uri(Path::new("/nonexistent/design.png"));
        assert!(matches!(result, Err(ImageLoadError::NotFound(_))));
    }

    #[test]
    fn downscale_halves_dimensions() {
        let pixels = RgbaImage::from_pixel(40, 20, image::Rgba([1, 2, 3, 255]));
        let img = DynamicImage::ImageRgba8(pixels);
        let uri = encode_png_data_uri(&img).expect("encode");
        assert!(uri.starts_with("data:image/png;base64,"));

        let scaled = downscale_data_uri(&uri, SCREENSHOT_SCALE).expect("downscale");
        let parsed: DataUri = scaled.parse().expect("parse");
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(parsed.data.as_bytes())
            .expect("decode");
        let decoded = image::load_from_memory(&bytes).expect("load");
        assert_eq!(decoded.dimensions(), (20, 10));
    }

    #[test]
    fn large_design_images_are_fitted() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("design.png");
        RgbaImage::from_pixel(3200, 800, image::Rgba([9, 9, 9, 255]))
            .save(&path)
            .expect("save");

        let uri = design_image_data_uri(&path).expect("design uri");
        let parsed: DataUri = uri.parse().expect("parse");
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(parsed.data.as_bytes())
            .expect("decode");
        let decoded = image::load_from_memory(&bytes).expect("load");
        assert_eq!(decoded.dimensions(), (1600, 400));
    }

    #[test]
    fn garbage_data_uri_is_rejected() {
        assert!(downscale_data_uri("not a data uri", 0.5).is_err());
    }
}
