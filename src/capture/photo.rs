//! Captured photo type

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::RgbaImage;

/// Encoded image bytes produced by one capture request
#[derive(Clone, Debug)]
pub struct CapturedPhoto {
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Local>,
}

impl CapturedPhoto {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            captured_at: Local::now(),
        }
    }

    /// Decode the encoded bytes into a displayable RGBA image
    pub fn decode(&self) -> Result<RgbaImage> {
        let img = image::load_from_memory(&self.bytes).context("Failed to decode captured photo")?;
        let rgba = img.to_rgba8();
        log::debug!(
            "CapturedPhoto decoded: {}x{} pixels from {} bytes",
            rgba.width(),
            rgba.height(),
            self.bytes.len()
        );
        Ok(rgba)
    }

    /// File name stem used when the photo is written to disk
    pub fn file_stem(&self) -> String {
        format!("capture_{}", self.captured_at.format("%Y-%m-%d_%H-%M-%S"))
    }
}

/// A captured photo plus its decoded, display-sized image
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub photo: CapturedPhoto,
    /// None when the bytes could not be decoded
    pub display: Option<RgbaImage>,
}

impl CapturedFrame {
    /// Decode `photo` and scale it down to at most `max_width` pixels wide
    pub fn prepare(photo: CapturedPhoto, max_width: u32) -> Self {
        let display = match photo.decode() {
            Ok(image) if image.width() > max_width.max(1) => {
                let width = max_width.max(1);
                let height = ((image.height() as u64 * width as u64) / image.width() as u64).max(1);
                Some(image::imageops::thumbnail(&image, width, height as u32))
            }
            Ok(image) => Some(image),
            Err(e) => {
                log::warn!("Captured photo not displayable: {:?}", e);
                None
            }
        };
        Self { photo, display }
    }
}

/// Solid-color PNG bytes for tests
#[cfg(test)]
pub(crate) fn encoded_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, image::Rgba([200, 180, 20, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
