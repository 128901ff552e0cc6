//! Scale levels: which octave serves each requested scale and how its
//! features are rescaled onto the full-frame channels.
//!
//! Feature rectangles scale by `rel = scale / octave_scale` (rounded, at least
//! one shrunk pixel). Split thresholds scale with the rectangle area ratio;
//! gradient channels additionally follow the power law
//! `(rel >= 1 ? 1 : 0.89 · rel^(1.099 / ln 2)) / rel²`. At `rel = 1` every
//! factor is exactly one.
use crate::channels::is_luv_channel;
use crate::model::{CascadeModel, Octave};
use crate::types::Rect;
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScaledFeature {
    pub channel: usize,
    /// Rectangle in shrunk coordinates, relative to the window origin.
    pub rect: Rect,
    /// Multiplier applied to split thresholds on this feature.
    pub factor: f32,
}

#[derive(Clone, Debug)]
pub(crate) struct Level {
    pub octave: usize,
    pub scale: f32,
    pub rel_scale: f32,
    pub shrinkage: usize,
    /// Object size in image pixels.
    pub object_width: i32,
    pub object_height: i32,
    /// Window positions along x / y, one shrunk pixel apart.
    pub cols: usize,
    pub rows: usize,
    pub features: Vec<ScaledFeature>,
}

impl Level {
    pub fn positions(&self) -> usize {
        self.cols * self.rows
    }

    /// Detection box of the window at shrunk offset `(dx, dy)`.
    #[inline]
    pub fn window_rect(&self, dx: usize, dy: usize) -> Rect {
        Rect::new(
            (dx * self.shrinkage) as i32,
            (dy * self.shrinkage) as i32,
            self.object_width,
            self.object_height,
        )
    }
}

/// Gradient-channel threshold scaling before the area ratio.
#[inline]
fn gradient_scaling(rel: f64) -> f64 {
    let approx = if rel >= 1.0 {
        1.0
    } else {
        0.89 * rel.powf(1.099 / std::f64::consts::LN_2)
    };
    approx / (rel * rel)
}

#[inline]
fn scale_coord(v: i32, rel: f64) -> i32 {
    (v as f64 * rel).round() as i32
}

pub(crate) fn scale_features(octave: &Octave, rel: f32, bins: usize) -> Vec<ScaledFeature> {
    let rel = rel as f64;
    let unit = rel == 1.0;
    let grad = gradient_scaling(rel);
    octave
        .features()
        .iter()
        .map(|f| {
            if unit {
                return ScaledFeature {
                    channel: f.channel,
                    rect: f.rect,
                    factor: 1.0,
                };
            }
            let rect = Rect::new(
                scale_coord(f.rect.x, rel),
                scale_coord(f.rect.y, rel),
                scale_coord(f.rect.width, rel).max(1),
                scale_coord(f.rect.height, rel).max(1),
            );
            let area_ratio = rect.area() as f64 / f.rect.area() as f64;
            let factor = if is_luv_channel(f.channel, bins) {
                area_ratio
            } else {
                grad * area_ratio
            };
            ScaledFeature {
                channel: f.channel,
                rect,
                factor: factor as f32,
            }
        })
        .collect()
}

/// Number of window positions along one axis.
fn axis_positions(
    frame: usize,
    channels: usize,
    shrinkage: usize,
    object: i32,
    extent: i32,
) -> usize {
    if object <= 0 || object as usize > frame || extent as usize > channels {
        return 0;
    }
    let by_object = (frame - object as usize) / shrinkage + 1;
    let by_features = channels - extent as usize + 1;
    by_object.min(by_features)
}

/// Levels for every scale of the model's sequence that fits a
/// `width × height` frame, plus the scales that were dropped.
pub(crate) fn compute_levels(
    model: &CascadeModel,
    width: usize,
    height: usize,
) -> (Vec<Level>, Vec<f32>) {
    let mut levels = Vec::new();
    let mut skipped = Vec::new();
    for scale in model.params().scale_sequence() {
        let Some(oi) = model.nearest_octave(scale) else {
            skipped.push(scale);
            continue;
        };
        let octave = &model.octaves()[oi];
        let rel = scale / octave.scale();
        let shrinkage = octave.shrinkage();
        let features = scale_features(octave, rel, model.bins());
        let extent_x = features.iter().map(|f| f.rect.right()).max().unwrap_or(0);
        let extent_y = features.iter().map(|f| f.rect.bottom()).max().unwrap_or(0);
        let window = octave.window();
        let object_width = (window.width as f32 * rel).round() as i32;
        let object_height = (window.height as f32 * rel).round() as i32;

        let cols = axis_positions(width, width / shrinkage, shrinkage, object_width, extent_x);
        let rows = axis_positions(height, height / shrinkage, shrinkage, object_height, extent_y);
        if cols == 0 || rows == 0 {
            debug!(
                "scale {:.3}: {}x{} object does not fit {}x{} frame, skipped",
                scale, object_width, object_height, width, height
            );
            skipped.push(scale);
            continue;
        }
        levels.push(Level {
            octave: oi,
            scale,
            rel_scale: rel,
            shrinkage,
            object_width,
            object_height,
            cols,
            rows,
            features,
        });
    }
    (levels, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boost::Split;
    use crate::detector::DetectorParams;
    use crate::features::FeatureRecord;
    use crate::model::{ModelDocument, OctaveRecord, TreeRecord};

    fn model(params: DetectorParams) -> CascadeModel {
        let octave = |log_scale: i32| OctaveRecord {
            log_scale,
            shrinkage: 4,
            bounding_box: Rect::new(0, 0, 32 << log_scale, 64 << log_scale),
            kind: 1,
            trees: vec![TreeRecord {
                depth: 1,
                nodes: vec![Split {
                    feature: 0,
                    threshold: 100.0,
                }],
                leaves: vec![-1.0, 1.0],
            }],
            thresholds: vec![-1.0],
            features: vec![
                FeatureRecord {
                    channel: 2,
                    rect: Rect::new(1, 2, 4, 8),
                },
                FeatureRecord {
                    channel: 8,
                    rect: Rect::new(0, 0, 8, 16),
                },
            ],
        };
        CascadeModel::load(&ModelDocument {
            detector: params,
            octaves: vec![octave(0), octave(1)],
            ..Default::default()
        })
        .expect("model")
    }

    #[test]
    fn unit_scale_keeps_features_exact() {
        let m = model(DetectorParams::default());
        let f = scale_features(&m.octaves()[0], 1.0, m.bins());
        assert_eq!(f[0].rect, Rect::new(1, 2, 4, 8));
        assert_eq!(f[0].factor, 1.0);
        assert_eq!(f[1].factor, 1.0);
    }

    #[test]
    fn downscaled_features_follow_power_law() {
        let m = model(DetectorParams::default());
        let f = scale_features(&m.octaves()[0], 0.5, m.bins());
        assert_eq!(f[0].rect, Rect::new(1, 1, 2, 4));
        assert_eq!(f[1].rect, Rect::new(0, 0, 4, 8));
        // colour channels only follow the area ratio
        assert!((f[1].factor - 0.25).abs() < 1e-6);
        let expected = 0.89 * 0.5f64.powf(1.099 / std::f64::consts::LN_2) / 0.25 * 0.25;
        assert!((f[0].factor as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn upscaled_gradient_factor_cancels_area() {
        let m = model(DetectorParams::default());
        let f = scale_features(&m.octaves()[0], 1.5, m.bins());
        assert_eq!(f[0].rect, Rect::new(2, 3, 6, 12));
        // area ratio 2.25 divided by rel² = 2.25
        assert!((f[0].factor - 1.0).abs() < 1e-6);
        assert!((f[1].factor - 2.25).abs() < 1e-6);
    }

    #[test]
    fn levels_skip_scales_that_do_not_fit() {
        let params = DetectorParams {
            min_scale: 1.0,
            max_scale: 4.0,
            scales: 3,
            ..Default::default()
        };
        let m = model(params);
        let (levels, skipped) = compute_levels(&m, 100, 100);
        // scale 1 fits as 32x64; scales 2 and 4 need 64x128 and 128x256
        assert_eq!(levels.len(), 1);
        assert_eq!(skipped.len(), 2);
        let l = &levels[0];
        assert_eq!((l.octave, l.object_width, l.object_height), (0, 32, 64));
        assert_eq!((l.cols, l.rows), (18, 10));
        assert_eq!(l.window_rect(2, 3), Rect::new(8, 12, 32, 64));
    }
}
