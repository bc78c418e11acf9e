//! Rectangular crop applied to an image before it is uploaded.

use std::io::Cursor;
use std::str::FromStr;

use image::{GenericImageView, ImageFormat};

use crate::error::{UploadError, UploadResult};
use crate::file::UploadFile;

/// Pixel rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn fits(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|right| right <= width)
            && self.y.checked_add(self.height).is_some_and(|bottom| bottom <= height)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for CropRegion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            anyhow::bail!("Invalid crop region '{}': expected x,y,width,height", s);
        }

        let mut values = [0u32; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part.parse().map_err(|_| {
                anyhow::anyhow!("Invalid crop region '{}': '{}' is not a number", s, part)
            })?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}

impl UploadFile {
    /// Copy of this file cropped to `region`, re-encoded in its own format.
    pub fn cropped(&self, region: CropRegion) -> UploadResult<UploadFile> {
        let reader = image::ImageReader::new(Cursor::new(&self.data[..]))
            .with_guessed_format()
            .map_err(|e| UploadError::Image(format!("Failed to read image: {}", e)))?;
        let format = reader.format().unwrap_or(ImageFormat::Png);
        let img = reader
            .decode()
            .map_err(|e| UploadError::Image(format!("Failed to decode image: {}", e)))?;

        let (width, height) = img.dimensions();
        if !region.fits(width, height) {
            return Err(UploadError::Image(format!(
                "Crop region {}x{} at ({}, {}) does not fit a {}x{} image",
                region.width, region.height, region.x, region.y, width, height
            )));
        }

        let cropped = img.crop_imm(region.x, region.y, region.width, region.height);
        tracing::debug!(
            file_name = %self.file_name,
            from = ?(width, height),
            to = ?(region.width, region.height),
            "Cropped image"
        );

        let mut buffer = Vec::new();
        cropped
            .write_to(&mut Cursor::new(&mut buffer), format)
            .map_err(|e| UploadError::Image(format!("Failed to encode image: {}", e)))?;

        Ok(UploadFile::new(
            self.file_name.clone(),
            format.to_mime_type(),
            buffer,
        ))
    }
}
