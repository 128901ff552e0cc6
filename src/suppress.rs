//! Non-maximum suppression over raw detections.
//!
//! `NoReject` hands the detections back untouched. `Dollar` sorts by
//! descending confidence (stable, so equal scores keep their scan order) and
//! greedily keeps the best box, discarding every later box whose overlap with
//! a kept one exceeds the threshold.
use crate::types::{Detection, Rect};
use serde::{Deserialize, Serialize};

/// Overlap above which `Dollar` suppression discards a detection.
pub const DOLLAR_OVERLAP_THRESHOLD: f32 = 0.65;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCriterion {
    #[default]
    NoReject,
    Dollar,
}

/// How two boxes' overlap is measured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapMeasure {
    /// Intersection over the smaller area.
    #[default]
    MinArea,
    /// Intersection over union.
    Iou,
}

impl OverlapMeasure {
    pub fn overlap(&self, a: &Rect, b: &Rect) -> f32 {
        let Some(inter) = a.intersection(b) else {
            return 0.0;
        };
        let inter = inter.area() as f64;
        let denom = match self {
            OverlapMeasure::MinArea => a.area().min(b.area()) as f64,
            OverlapMeasure::Iou => (a.area() + b.area()) as f64 - inter,
        };
        if denom <= 0.0 {
            0.0
        } else {
            (inter / denom) as f32
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Suppressor {
    pub criterion: RejectionCriterion,
    pub overlap: OverlapMeasure,
    /// Boxes overlapping a kept box by more than this are dropped.
    pub threshold: f32,
}

impl Default for Suppressor {
    fn default() -> Self {
        Self::new(RejectionCriterion::NoReject)
    }
}

impl Suppressor {
    pub fn new(criterion: RejectionCriterion) -> Self {
        Self {
            criterion,
            overlap: OverlapMeasure::MinArea,
            threshold: DOLLAR_OVERLAP_THRESHOLD,
        }
    }

    pub fn with_overlap(mut self, overlap: OverlapMeasure, threshold: f32) -> Self {
        self.overlap = overlap;
        self.threshold = threshold;
        self
    }

    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        match self.criterion {
            RejectionCriterion::NoReject => detections,
            RejectionCriterion::Dollar => self.greedy(detections),
        }
    }

    fn greedy(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
        for det in detections {
            let suppressed = kept
                .iter()
                .any(|k| self.overlap.overlap(&k.bbox, &det.bbox) > self.threshold);
            if !suppressed {
                kept.push(det);
            }
        }
        kept
    }
}

/// Suppress with the default overlap measure and threshold.
pub fn suppress(detections: Vec<Detection>, criterion: RejectionCriterion) -> Vec<Detection> {
    Suppressor::new(criterion).apply(detections)
}
