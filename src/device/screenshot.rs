//! Captured screen images.

use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, RgbImage};
use std::io::Cursor;

/// Width of the placeholder image used when capture fails.
pub const FALLBACK_WIDTH: u32 = 1080;

/// Height of the placeholder image used when capture fails.
pub const FALLBACK_HEIGHT: u32 = 2400;

/// Represents a captured screenshot.
#[derive(Debug, Clone)]
pub struct Screenshot {
    pub base64_data: String,
    pub width: u32,
    pub height: u32,
    /// The image is a placeholder, not the real screen.
    pub is_fallback: bool,
    /// The platform refused capture (payment, password or other protected page).
    pub is_sensitive: bool,
}

impl Screenshot {
    /// Create a new screenshot of the real screen.
    pub fn new(base64_data: String, width: u32, height: u32) -> Self {
        Self {
            base64_data,
            width,
            height,
            is_fallback: false,
            is_sensitive: false,
        }
    }

    /// Build a screenshot from raw PNG bytes, reading the dimensions from the image.
    pub fn from_png(png_data: &[u8]) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(png_data)?;
        Ok(Self::new(STANDARD.encode(png_data), img.width(), img.height()))
    }

    /// Create a black placeholder screenshot.
    pub fn fallback(is_sensitive: bool) -> Self {
        let black_img =
            RgbImage::from_pixel(FALLBACK_WIDTH, FALLBACK_HEIGHT, image::Rgb([0, 0, 0]));
        let dynamic_img = DynamicImage::ImageRgb8(black_img);

        let mut buffer = Cursor::new(Vec::new());
        if let Err(e) = dynamic_img.write_to(&mut buffer, image::ImageFormat::Png) {
            tracing::error!("Failed to encode placeholder screenshot: {}", e);
        }

        Self {
            base64_data: STANDARD.encode(buffer.into_inner()),
            width: FALLBACK_WIDTH,
            height: FALLBACK_HEIGHT,
            is_fallback: true,
            is_sensitive,
        }
    }
}
