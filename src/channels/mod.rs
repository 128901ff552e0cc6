//! Integral channel features: HOG orientation bins, gradient magnitude and Luv.
//!
//! Overview
//! - Converts the input to gray (`0.299 R + 0.587 G + 0.114 B`) and computes
//!   Sobel gradients; each pixel's scaled magnitude is written into its
//!   orientation-bin channel and into a dedicated magnitude channel.
//! - Converts the input to 8-bit Luv (gray input is treated as R = G = B).
//! - Area-shrinks every channel by the shrinkage factor, then builds one
//!   integral image per channel so any rectangle sum is O(1).
//!
//! Channel order is fixed: `bins` orientation channels, magnitude, L, u, v.
//! With the default six bins that is the ten-channel ICF layout.

pub mod grad;
pub mod integral;
pub mod luv;
pub mod shrink;

use crate::error::{CascadeError, Result};
use crate::image::{ImageF32, ImageU8, ImageView};
use crate::types::Rect;
use grad::oriented_gradients;
pub use integral::IntegralImage;
use log::debug;
use luv::rgb_to_luv8;
use shrink::shrink_area;

/// Default number of HOG orientation bins.
pub const DEFAULT_HOG_BINS: usize = 6;
/// Channels appended after the orientation bins: magnitude, L, u, v.
pub const EXTRA_CHANNELS: usize = 4;

/// Total channel count for a given number of orientation bins.
#[inline]
pub const fn channel_count(bins: usize) -> usize {
    bins + EXTRA_CHANNELS
}

/// True for the three colour channels, which rescale with area rather than
/// with the gradient power law.
#[inline]
pub const fn is_luv_channel(channel: usize, bins: usize) -> bool {
    channel > bins
}

/// Ordered integral channels of one frame.
#[derive(Clone, Debug)]
pub struct Channels {
    shrinkage: usize,
    bins: usize,
    width: usize,
    height: usize,
    integrals: Vec<IntegralImage>,
}

impl Channels {
    pub fn shrinkage(&self) -> usize {
        self.shrinkage
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Width of the shrunk planes.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the shrunk planes.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.integrals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrals.is_empty()
    }

    pub fn integral(&self, channel: usize) -> &IntegralImage {
        &self.integrals[channel]
    }

    /// Sum of `channel` over `rect` (shrunk coordinates) offset by `(dx, dy)`.
    #[inline]
    pub fn sum(&self, channel: usize, rect: &Rect, dx: usize, dy: usize) -> u32 {
        self.integrals[channel].rect_sum(rect, dx, dy)
    }
}

/// Computes [`Channels`] for a fixed shrinkage and bin count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelComputer {
    shrinkage: usize,
    bins: usize,
}

impl ChannelComputer {
    pub fn new(shrinkage: usize) -> Self {
        Self {
            shrinkage,
            bins: DEFAULT_HOG_BINS,
        }
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    pub fn shrinkage(&self) -> usize {
        self.shrinkage
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn channel_count(&self) -> usize {
        channel_count(self.bins)
    }

    /// Compute the integral channels of `image`.
    pub fn apply(&self, image: &ImageU8<'_>) -> Result<Channels> {
        image.validate()?;
        if self.shrinkage == 0 || self.bins == 0 || self.bins > u8::MAX as usize {
            return Err(CascadeError::invalid(format!(
                "channel computer needs shrinkage >= 1 and 1..=255 bins, got {} / {}",
                self.shrinkage, self.bins
            )));
        }
        if image.w < self.shrinkage || image.h < self.shrinkage {
            return Err(CascadeError::invalid(format!(
                "image {}x{} is smaller than one {}px shrinkage block",
                image.w, image.h, self.shrinkage
            )));
        }

        let (w, h) = (image.w, image.h);
        let nchannels = self.channel_count();
        let mut planes = vec![vec![0u8; w * h]; nchannels];

        let gray = to_gray(image);
        let grads = oriented_gradients(&gray, self.bins);
        let mag_channel = self.bins;
        for (i, (&m, &b)) in grads.mag.data.iter().zip(grads.bin.iter()).enumerate() {
            let v = m.round().clamp(0.0, 255.0) as u8;
            planes[b as usize][i] = v;
            planes[mag_channel][i] = v;
        }

        let l_channel = self.bins + 1;
        for y in 0..h {
            let row = image.row(y);
            for x in 0..w {
                let (r, g, b) = if image.channels == 3 {
                    (row[3 * x], row[3 * x + 1], row[3 * x + 2])
                } else {
                    (row[x], row[x], row[x])
                };
                let luv = rgb_to_luv8(r, g, b);
                let i = y * w + x;
                planes[l_channel][i] = luv[0];
                planes[l_channel + 1][i] = luv[1];
                planes[l_channel + 2][i] = luv[2];
            }
        }

        let mut integrals = Vec::with_capacity(nchannels);
        let (mut sw, mut sh) = (0, 0);
        for plane in &planes {
            let (shrunk, nw, nh) = shrink_area(plane, w, h, self.shrinkage);
            integrals.push(IntegralImage::from_plane(&shrunk, nw, nh));
            sw = nw;
            sh = nh;
        }
        debug!(
            "ChannelComputer::apply {}x{} -> {} channels at {}x{} (shrinkage {})",
            w, h, nchannels, sw, sh, self.shrinkage
        );

        Ok(Channels {
            shrinkage: self.shrinkage,
            bins: self.bins,
            width: sw,
            height: sh,
            integrals,
        })
    }
}

fn to_gray(image: &ImageU8<'_>) -> ImageF32 {
    let mut out = ImageF32::new(image.w, image.h);
    for y in 0..image.h {
        let src = image.row(y);
        for x in 0..image.w {
            let v = if image.channels == 3 {
                0.299 * src[3 * x] as f32 + 0.587 * src[3 * x + 1] as f32 + 0.114 * src[3 * x + 2] as f32
            } else {
                src[x] as f32
            };
            out.set(x, y, v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_ten_channels_at_shrunk_size() {
        let data = vec![90u8; 17 * 9 * 3];
        let img = ImageU8::rgb(17, 9, &data);
        let ch = ChannelComputer::new(4).apply(&img).expect("channels");
        assert_eq!(ch.len(), 10);
        assert_eq!((ch.width(), ch.height()), (4, 2));
        assert_eq!(ch.shrinkage(), 4);
    }

    #[test]
    fn flat_image_has_no_gradient_energy() {
        let data = vec![200u8; 16 * 16];
        let img = ImageU8::gray(16, 16, &data);
        let ch = ChannelComputer::new(2).apply(&img).expect("channels");
        let full = Rect::new(0, 0, 8, 8);
        for c in 0..=DEFAULT_HOG_BINS {
            assert_eq!(ch.sum(c, &full, 0, 0), 0, "channel {c}");
        }
        assert!(ch.sum(DEFAULT_HOG_BINS + 1, &full, 0, 0) > 0);
    }

    #[test]
    fn white_square_fills_lightness_channel() {
        let (w, h) = (16usize, 16usize);
        let mut data = vec![0u8; w * h * 3];
        for y in 4..12 {
            for x in 4..12 {
                data[(y * w + x) * 3..(y * w + x) * 3 + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        let img = ImageU8::rgb(w, h, &data);
        let ch = ChannelComputer::new(4).apply(&img).expect("channels");
        let l = DEFAULT_HOG_BINS + 1;
        assert_eq!(ch.sum(l, &Rect::new(1, 1, 2, 2), 0, 0), 4 * 255);
        assert_eq!(ch.sum(l, &Rect::new(0, 0, 1, 4), 0, 0), 0);
        assert!(ch.sum(DEFAULT_HOG_BINS, &Rect::new(0, 0, 4, 4), 0, 0) > 0);
    }

    #[test]
    fn rejects_invalid_input() {
        let data = vec![0u8; 12];
        let too_small = ImageU8::gray(3, 4, &data);
        assert!(matches!(
            ChannelComputer::new(4).apply(&too_small),
            Err(CascadeError::InvalidInput(_))
        ));
        let empty = ImageU8::gray(0, 0, &data);
        assert!(ChannelComputer::new(1).apply(&empty).is_err());
    }
}
