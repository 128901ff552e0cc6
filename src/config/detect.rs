use crate::detector::DetectorParams;
use crate::suppress::{OverlapMeasure, RejectionCriterion, DOLLAR_OVERLAP_THRESHOLD};
use crate::types::Rect;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct DetectToolConfig {
    pub input: PathBuf,
    /// Model document written by the trainer.
    pub model: PathBuf,
    /// Replaces the model's own scale range when present.
    #[serde(default)]
    pub detector: Option<DetectorParams>,
    #[serde(default)]
    pub suppression: Option<SuppressionConfig>,
    /// Restrict the scan to these regions; empty means the whole frame.
    #[serde(default)]
    pub rois: Vec<Rect>,
    pub output: DetectOutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SuppressionConfig {
    pub criterion: RejectionCriterion,
    pub overlap: OverlapMeasure,
    pub threshold: f32,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            criterion: RejectionCriterion::Dollar,
            overlap: OverlapMeasure::MinArea,
            threshold: DOLLAR_OVERLAP_THRESHOLD,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DetectOutputConfig {
    pub detections_json: PathBuf,
    /// Copy of the input with detection boxes drawn in.
    #[serde(default)]
    pub annotated_image: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<DetectToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}
