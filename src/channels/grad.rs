//! Sobel gradients with magnitude and orientation binning for the HOG channels.
//!
//! - Convolves the 3×3 Sobel pair with border clamping (replicate).
//! - Magnitude is normalised by `1 / (8·√2)` so that the strongest possible
//!   8-bit edge stays inside the 8-bit channel range.
//! - Orientation is the full-circle angle `atan2(gy, gx)` in degrees
//!   `[0, 360)`, quantised into `bins` uniform bins.
use crate::image::{ImageF32, ImageView, ImageViewMut};

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Scale applied to the raw Sobel magnitude.
pub const MAGNITUDE_SCALE: f32 = 1.0 / (8.0 * std::f32::consts::SQRT_2);

/// Per-pixel normalised magnitude and orientation bin.
#[derive(Clone, Debug)]
pub struct OrientedGradients {
    pub mag: ImageF32,
    pub bin: Vec<u8>,
}

#[inline]
pub(crate) fn orientation_bin(gx: f32, gy: f32, bins: usize) -> usize {
    let mut deg = gy.atan2(gx).to_degrees();
    if deg < 0.0 {
        deg += 360.0;
    }
    ((deg * bins as f32 / 360.0) as usize).min(bins - 1)
}

/// Compute Sobel gradients on a gray plane and bin orientations.
pub fn oriented_gradients(l: &ImageF32, bins: usize) -> OrientedGradients {
    let (w, h) = (l.w, l.h);
    let mut mag = ImageF32::new(w, h);
    let mut bin = vec![0u8; w * h];
    if w == 0 || h == 0 {
        return OrientedGradients { mag, bin };
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [l.row(y_idx[0]), l.row(y_idx[1]), l.row(y_idx[2])];
        let out_mag = mag.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, yy_row) in rows.iter().enumerate() {
                let kx_row = &SOBEL_KERNEL_X[ky];
                let ky_row = &SOBEL_KERNEL_Y[ky];
                sum_x += yy_row[x_idx[0]] * kx_row[0]
                    + yy_row[x_idx[1]] * kx_row[1]
                    + yy_row[x_idx[2]] * kx_row[2];
                sum_y += yy_row[x_idx[0]] * ky_row[0]
                    + yy_row[x_idx[1]] * ky_row[1]
                    + yy_row[x_idx[2]] * ky_row[2];
            }

            out_mag[x] = (sum_x * sum_x + sum_y * sum_y).sqrt() * MAGNITUDE_SCALE;
            bin[y * w + x] = orientation_bin(sum_x, sum_y, bins) as u8;
        }
    }

    OrientedGradients { mag, bin }
}
