use super::traits::ImageView;
use crate::error::{CascadeError, Result};
use crate::types::Rect;

/// Borrowed 8-bit image with interleaved channels (1 = gray, 3 = RGB).
#[derive(Clone, Copy, Debug)]
pub struct ImageU8<'a> {
    pub w: usize,
    pub h: usize,
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub channels: usize,
    pub data: &'a [u8],
}

impl<'a> ImageU8<'a> {
    pub fn gray(w: usize, h: usize, data: &'a [u8]) -> Self {
        Self {
            w,
            h,
            stride: w,
            channels: 1,
            data,
        }
    }

    pub fn rgb(w: usize, h: usize, data: &'a [u8]) -> Self {
        Self {
            w,
            h,
            stride: w * 3,
            channels: 3,
            data,
        }
    }

    /// Checks dimensions, channel count and that `data` covers every row.
    pub fn validate(&self) -> Result<()> {
        if self.w == 0 || self.h == 0 {
            return Err(CascadeError::invalid(format!(
                "empty image {}x{}",
                self.w, self.h
            )));
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(CascadeError::invalid(format!(
                "expected 1 or 3 channels, got {}",
                self.channels
            )));
        }
        let row_len = self.w * self.channels;
        if self.stride < row_len {
            return Err(CascadeError::invalid(format!(
                "stride {} shorter than row length {}",
                self.stride, row_len
            )));
        }
        let needed = (self.h - 1) * self.stride + row_len;
        if self.data.len() < needed {
            return Err(CascadeError::invalid(format!(
                "buffer holds {} bytes, {} required",
                self.data.len(),
                needed
            )));
        }
        Ok(())
    }

    /// Samples of pixel (x, y).
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let start = y * self.stride + x * self.channels;
        &self.data[start..start + self.channels]
    }

    /// Zero-copy view of a sub-rectangle, `None` if it leaves the image.
    pub fn roi(&self, r: &Rect) -> Option<ImageU8<'a>> {
        if r.is_empty() || r.x < 0 || r.y < 0 {
            return None;
        }
        let (x, y, w, h) = (r.x as usize, r.y as usize, r.width as usize, r.height as usize);
        if x + w > self.w || y + h > self.h {
            return None;
        }
        let start = y * self.stride + x * self.channels;
        Some(ImageU8 {
            w,
            h,
            stride: self.stride,
            channels: self.channels,
            data: &self.data[start..],
        })
    }
}

impl<'a> ImageView for ImageU8<'a> {
    type Pixel = u8;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn channels(&self) -> usize {
        self.channels
    }
    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.w * self.channels]
    }
}
