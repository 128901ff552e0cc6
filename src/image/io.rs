//! Owned image buffers plus file helpers for images and JSON.
//!
//! - `load_rgb_image`: read a PNG/JPEG/etc. into an owned 8-bit RGB buffer.
//! - `save_rgb_image`: write an owned RGB (or gray) buffer to disk.
//! - `write_json_file` / `read_json_file`: pretty JSON persistence.
use super::ImageU8;
use crate::error::{CascadeError, Result};
use image::{GrayImage, RgbImage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Owned 8-bit image with interleaved channels and tight rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImageU8 {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl OwnedImageU8 {
    /// Wrap raw bytes; the buffer must hold exactly `width * height * channels` samples.
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != width * height * channels {
            return Err(CascadeError::invalid(format!(
                "buffer of {} bytes does not match {}x{}x{}",
                data.len(),
                width,
                height,
                channels
            )));
        }
        let img = Self {
            width,
            height,
            channels,
            data,
        };
        img.as_view().validate()?;
        Ok(img)
    }

    /// Image with every sample set to `value`.
    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![value; width * height * channels],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Borrow as a read-only `ImageU8` view.
    pub fn as_view(&self) -> ImageU8<'_> {
        ImageU8 {
            w: self.width,
            h: self.height,
            stride: self.width * self.channels,
            channels: self.channels,
            data: &self.data,
        }
    }
}

/// Load an image from disk and convert to 8-bit RGB.
pub fn load_rgb_image(path: &Path) -> Result<OwnedImageU8> {
    let img = image::open(path)?.into_rgb8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    OwnedImageU8::new(width, height, 3, img.into_raw())
}

/// Save an owned gray or RGB buffer, format picked from the extension.
pub fn save_rgb_image(buffer: &OwnedImageU8, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let (w, h) = (buffer.width as u32, buffer.height as u32);
    let data = buffer.data.clone();
    let mismatch = || CascadeError::invalid("image buffer does not match its dimensions");
    match buffer.channels {
        1 => GrayImage::from_raw(w, h, data).ok_or_else(mismatch)?.save(path)?,
        3 => RgbImage::from_raw(w, h, data).ok_or_else(mismatch)?.save(path)?,
        n => {
            return Err(CascadeError::invalid(format!(
                "cannot save image with {n} channels"
            )))
        }
    }
    Ok(())
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_roundtrip_preserves_pixels() {
        let mut img = OwnedImageU8::filled(5, 3, 3, 10);
        img.data_mut()[7] = 200;
        let path = std::env::temp_dir()
            .join(format!("soft_cascade_io_{}", std::process::id()))
            .join("roundtrip.png");
        save_rgb_image(&img, &path).expect("save");
        let back = load_rgb_image(&path).expect("load");
        assert_eq!(back, img);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn new_rejects_wrong_length() {
        assert!(OwnedImageU8::new(4, 4, 3, vec![0; 10]).is_err());
        assert!(OwnedImageU8::new(4, 4, 1, vec![0; 16]).is_ok());
    }
}
