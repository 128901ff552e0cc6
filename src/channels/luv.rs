//! sRGB → CIE L*u*v* conversion scaled to the 8-bit channel range.

const UN: f32 = 0.197_939_43;
const VN: f32 = 0.468_310_96;

#[inline]
fn linearize(c: u8) -> f32 {
    let v = c as f32 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Convert one RGB pixel to 8-bit `[L, u, v]`:
/// `L·255/100`, `(u + 134)·255/354`, `(v + 140)·255/262`.
pub fn rgb_to_luv8(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (r, g, b) = (linearize(r), linearize(g), linearize(b));
    let x = 0.412_453 * r + 0.357_580 * g + 0.180_423 * b;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = 0.019_334 * r + 0.119_193 * g + 0.950_227 * b;

    let l = if y > 0.008_856 {
        116.0 * y.cbrt() - 16.0
    } else {
        903.3 * y
    };
    let d = x + 15.0 * y + 3.0 * z;
    let (u, v) = if d > f32::EPSILON {
        let up = 4.0 * x / d;
        let vp = 9.0 * y / d;
        (13.0 * l * (up - UN), 13.0 * l * (vp - VN))
    } else {
        (0.0, 0.0)
    };

    [
        saturate(l * 255.0 / 100.0),
        saturate((u + 134.0) * 255.0 / 354.0),
        saturate((v + 140.0) * 255.0 / 262.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_and_black_lightness() {
        assert_eq!(rgb_to_luv8(255, 255, 255)[0], 255);
        assert_eq!(rgb_to_luv8(0, 0, 0)[0], 0);
    }

    #[test]
    fn gray_is_achromatic() {
        let [_, u, v] = rgb_to_luv8(128, 128, 128);
        let [_, u0, v0] = rgb_to_luv8(0, 0, 0);
        assert!((u as i32 - u0 as i32).abs() <= 1);
        assert!((v as i32 - v0 as i32).abs() <= 1);
    }

    #[test]
    fn red_pushes_u_positive() {
        let [_, u, _] = rgb_to_luv8(255, 0, 0);
        let [_, u_gray, _] = rgb_to_luv8(128, 128, 128);
        assert!(u > u_gray);
    }
}
