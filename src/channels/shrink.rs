//! Area downsampling of 8-bit planes by an integer shrinkage factor.
//!
//! Each output pixel is the rounded mean of a `s × s` block; trailing
//! columns/rows that do not fill a whole block are dropped.

/// Returns the shrunk plane and its `(width, height)`.
pub fn shrink_area(plane: &[u8], w: usize, h: usize, s: usize) -> (Vec<u8>, usize, usize) {
    debug_assert!(s >= 1);
    let (nw, nh) = (w / s, h / s);
    if s == 1 {
        return (plane[..w * h].to_vec(), w, h);
    }
    let block = (s * s) as u32;
    let mut out = vec![0u8; nw * nh];
    // column sums for one output row, reused across rows
    let mut col_acc = vec![0u32; nw];
    for oy in 0..nh {
        col_acc.iter_mut().for_each(|v| *v = 0);
        for sy in oy * s..(oy + 1) * s {
            let src = &plane[sy * w..sy * w + nw * s];
            for (ox, acc) in col_acc.iter_mut().enumerate() {
                *acc += src[ox * s..(ox + 1) * s]
                    .iter()
                    .map(|&v| v as u32)
                    .sum::<u32>();
            }
        }
        let dst = &mut out[oy * nw..(oy + 1) * nw];
        for (d, &acc) in dst.iter_mut().zip(col_acc.iter()) {
            *d = ((acc + block / 2) / block) as u8;
        }
    }
    (out, nw, nh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_blocks_and_drops_remainder() {
        #[rustfmt::skip]
        let plane = [
            0, 4, 10, 10, 9,
            8, 4, 10, 10, 9,
            1, 1, 1, 1, 1,
        ];
        let (out, w, h) = shrink_area(&plane, 5, 3, 2);
        assert_eq!((w, h), (2, 1));
        assert_eq!(out, vec![4, 10]);
    }

    #[test]
    fn unit_shrinkage_copies() {
        let plane = [1u8, 2, 3, 4];
        assert_eq!(shrink_area(&plane, 2, 2, 1), (plane.to_vec(), 2, 2));
    }
}
