//! Serialized model layout (JSON).
//!
//! ```json
//! {
//!   "detector": { "min_scale": 0.4, "max_scale": 5.0, "scales": 55, "rejection": "DOLLAR" },
//!   "hog_bins": 6,
//!   "octaves": [{
//!     "log_scale": 0, "shrinkage": 4,
//!     "bounding_box": { "x": 0, "y": 0, "width": 64, "height": 128 },
//!     "kind": 1,
//!     "trees": [{ "depth": 2, "nodes": [{ "feature": 0, "threshold": 12.5 }, ...], "leaves": [...] }],
//!     "thresholds": [...],
//!     "features": [{ "channel": 7, "rect": { "x": 1, "y": 2, "width": 3, "height": 4 } }]
//!   }]
//! }
//! ```
use crate::boost::Split;
use crate::channels::DEFAULT_HOG_BINS;
use crate::detector::DetectorParams;
use crate::features::FeatureRecord;
use crate::types::{default_kind, Rect};
use serde::{Deserialize, Serialize};

fn default_hog_bins() -> usize {
    DEFAULT_HOG_BINS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub detector: DetectorParams,
    #[serde(default = "default_hog_bins")]
    pub hog_bins: usize,
    #[serde(default)]
    pub octaves: Vec<OctaveRecord>,
}

impl Default for ModelDocument {
    fn default() -> Self {
        Self {
            detector: DetectorParams::default(),
            hog_bins: DEFAULT_HOG_BINS,
            octaves: Vec::new(),
        }
    }
}

/// One trained octave as written by the trainer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OctaveRecord {
    /// Octave scale is `2^log_scale`.
    pub log_scale: i32,
    pub shrinkage: usize,
    /// Detection window in pixels; only its size is used.
    pub bounding_box: Rect,
    #[serde(default = "default_kind")]
    pub kind: i32,
    pub trees: Vec<TreeRecord>,
    /// One rejection threshold per tree.
    pub thresholds: Vec<f32>,
    /// Octave-local feature table referenced by the tree nodes.
    pub features: Vec<FeatureRecord>,
}

/// Complete binary tree: `2^depth - 1` nodes in breadth-first order, then
/// `2^depth` leaves left to right.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub depth: usize,
    pub nodes: Vec<Split>,
    pub leaves: Vec<f32>,
}
