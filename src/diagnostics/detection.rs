use super::TimingBreakdown;
use crate::types::{Detection, Rect};
use serde::Serialize;

/// Frame the detector ran on.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub rois: Vec<Rect>,
}

/// Work done on one pyramid level.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelReport {
    pub scale: f32,
    pub octave: usize,
    pub rel_scale: f32,
    /// Object size in image pixels at this level.
    pub object_width: i32,
    pub object_height: i32,
    /// Window positions the level admits.
    pub positions: usize,
    /// Positions outside every ROI.
    pub skipped: usize,
    pub evaluated: usize,
    /// Windows surviving every rejection threshold.
    pub accepted: usize,
    /// Weak learners evaluated across all windows.
    pub weak_evaluations: u64,
}

/// Diagnostics of [`crate::SoftCascadeDetector::detect_with_report`].
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub input: InputDescriptor,
    pub levels: Vec<LevelReport>,
    /// Scales dropped because the object does not fit the frame.
    pub skipped_scales: Vec<f32>,
    pub raw_detections: Vec<Detection>,
    pub detections: Vec<Detection>,
    pub timings: TimingBreakdown,
}

impl DetectionReport {
    pub fn evaluated_windows(&self) -> usize {
        self.levels.iter().map(|l| l.evaluated).sum()
    }

    /// Mean number of weak learners evaluated per window; the early-exit
    /// savings show up as a value well below the tree count.
    pub fn mean_weaks_per_window(&self) -> f64 {
        let windows = self.evaluated_windows();
        if windows == 0 {
            return 0.0;
        }
        let weaks: u64 = self.levels.iter().map(|l| l.weak_evaluations).sum();
        weaks as f64 / windows as f64
    }
}
