//! Summed-area tables over 8-bit channel planes.
use crate::types::Rect;

/// Integral image with one extra leading row and column of zeros.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegralImage {
    /// Width of the source plane.
    pub w: usize,
    /// Height of the source plane.
    pub h: usize,
    data: Vec<u32>,
}

impl IntegralImage {
    /// Build from a row-major `w × h` plane.
    pub fn from_plane(plane: &[u8], w: usize, h: usize) -> Self {
        debug_assert_eq!(plane.len(), w * h);
        let stride = w + 1;
        let mut data = vec![0u32; stride * (h + 1)];
        for y in 0..h {
            let mut row_sum = 0u32;
            let src = &plane[y * w..(y + 1) * w];
            for (x, &v) in src.iter().enumerate() {
                row_sum = row_sum.wrapping_add(v as u32);
                data[(y + 1) * stride + x + 1] = data[y * stride + x + 1].wrapping_add(row_sum);
            }
        }
        Self { w, h, data }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> u32 {
        self.data[y * (self.w + 1) + x]
    }

    /// Sum of the source plane over `[x, x+w) × [y, y+h)`.
    ///
    /// The rectangle must lie inside the plane; callers validate geometry up
    /// front so this never needs to clip. Table entries wrap on very large
    /// frames, which modular arithmetic undoes for any sum below `2^32`.
    #[inline]
    pub fn sum(&self, x: usize, y: usize, w: usize, h: usize) -> u32 {
        let (x1, y1) = (x + w, y + h);
        self.at(x1, y1)
            .wrapping_add(self.at(x, y))
            .wrapping_sub(self.at(x1, y).wrapping_add(self.at(x, y1)))
    }

    /// Same as [`IntegralImage::sum`] for a non-negative [`Rect`] offset by `(dx, dy)`.
    #[inline]
    pub fn rect_sum(&self, r: &Rect, dx: usize, dy: usize) -> u32 {
        self.sum(
            dx + r.x as usize,
            dy + r.y as usize,
            r.width as usize,
            r.height as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_sums_match_brute_force() {
        let (w, h) = (7usize, 5usize);
        let plane: Vec<u8> = (0..w * h).map(|i| (i * 37 % 251) as u8).collect();
        let ii = IntegralImage::from_plane(&plane, w, h);
        for (x, y, rw, rh) in [(0, 0, 7, 5), (2, 1, 3, 2), (6, 4, 1, 1), (1, 3, 0, 2)] {
            let mut expected = 0u32;
            for yy in y..y + rh {
                for xx in x..x + rw {
                    expected += plane[yy * w + xx] as u32;
                }
            }
            assert_eq!(ii.sum(x, y, rw, rh), expected, "rect ({x},{y},{rw},{rh})");
        }
    }
}
