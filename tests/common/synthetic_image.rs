use soft_cascade::boost::Split;
use soft_cascade::features::FeatureRecord;
use soft_cascade::model::TreeRecord;
use soft_cascade::{DetectorParams, ModelDocument, OctaveRecord, Rect, RejectionCriterion};

/// Window of the stub octave, in pixels.
pub const STUB_WINDOW: (i32, i32) = (32, 64);
pub const STUB_SHRINKAGE: usize = 4;
/// L channel with the default six orientation bins.
pub const L_CHANNEL: usize = 7;

/// Black gray image with one white `bw × bh` block at `(bx, by)`.
pub fn block_gray_u8(
    width: usize,
    height: usize,
    bx: usize,
    by: usize,
    bw: usize,
    bh: usize,
) -> Vec<u8> {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    let mut img = vec![0u8; width * height];
    for y in by..(by + bh).min(height) {
        for x in bx..(bx + bw).min(width) {
            img[y * width + x] = 255;
        }
    }
    img
}

/// Same pattern as [`block_gray_u8`], interleaved RGB.
pub fn block_rgb_u8(
    width: usize,
    height: usize,
    bx: usize,
    by: usize,
    bw: usize,
    bh: usize,
) -> Vec<u8> {
    block_gray_u8(width, height, bx, by, bw, bh)
        .into_iter()
        .flat_map(|v| [v, v, v])
        .collect()
}

/// Single-stump octave firing when at least 95% of the window is white.
pub fn stub_octave() -> OctaveRecord {
    let (w, h) = STUB_WINDOW;
    let s = STUB_SHRINKAGE as i32;
    let full_area = (w / s * h / s) as f32;
    OctaveRecord {
        log_scale: 0,
        shrinkage: STUB_SHRINKAGE,
        bounding_box: Rect::new(0, 0, w, h),
        kind: 1,
        trees: vec![TreeRecord {
            depth: 1,
            nodes: vec![Split {
                feature: 0,
                threshold: 0.95 * 255.0 * full_area,
            }],
            leaves: vec![-1.0, 1.0],
        }],
        thresholds: vec![0.0],
        features: vec![FeatureRecord {
            channel: L_CHANNEL,
            rect: Rect::new(0, 0, w / s, h / s),
        }],
    }
}

/// Stub model scanning only at scale 1.
pub fn stub_document(rejection: RejectionCriterion) -> ModelDocument {
    ModelDocument {
        detector: DetectorParams {
            min_scale: 1.0,
            max_scale: 1.0,
            scales: 1,
            rejection,
        },
        octaves: vec![stub_octave()],
        ..Default::default()
    }
}

/// Uniform noise in `[lo, hi]`, reproducible from `seed`.
pub fn noise_u8(width: usize, height: usize, channels: usize, lo: u8, hi: u8, seed: u64) -> Vec<u8> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height * channels)
        .map(|_| rng.gen_range(lo..=hi))
        .collect()
}
