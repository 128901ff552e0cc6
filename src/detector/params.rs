//! Global detection parameters persisted alongside the octaves.
use crate::error::{CascadeError, Result};
use crate::suppress::RejectionCriterion;
use serde::{Deserialize, Serialize};

/// Scale range swept by the detector and the suppression applied afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Smallest object scale relative to the training window.
    pub min_scale: f32,
    /// Largest object scale relative to the training window.
    pub max_scale: f32,
    /// Number of log-spaced scales in `[min_scale, max_scale]`.
    pub scales: usize,
    /// Non-maximum suppression applied to raw detections.
    pub rejection: RejectionCriterion,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            min_scale: 0.4,
            max_scale: 5.0,
            scales: 55,
            rejection: RejectionCriterion::NoReject,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err(CascadeError::malformed(format!(
                "min_scale must be positive, got {}",
                self.min_scale
            )));
        }
        if !self.max_scale.is_finite() || self.max_scale < self.min_scale {
            return Err(CascadeError::malformed(format!(
                "max_scale {} below min_scale {}",
                self.max_scale, self.min_scale
            )));
        }
        if self.scales == 0 {
            return Err(CascadeError::malformed("scales must be at least 1"));
        }
        Ok(())
    }

    /// Log-linearly spaced scales from `min_scale` to `max_scale`.
    pub fn scale_sequence(&self) -> Vec<f32> {
        if self.scales == 1 || self.min_scale == self.max_scale {
            return vec![self.min_scale];
        }
        let log_min = (self.min_scale as f64).ln();
        let log_max = (self.max_scale as f64).ln();
        let step = (log_max - log_min) / (self.scales - 1) as f64;
        (0..self.scales)
            .map(|i| {
                if i + 1 == self.scales {
                    self.max_scale
                } else {
                    (log_min + step * i as f64).exp() as f32
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_sequence_spans_range_geometrically() {
        let p = DetectorParams {
            min_scale: 0.5,
            max_scale: 2.0,
            scales: 3,
            ..Default::default()
        };
        let s = p.scale_sequence();
        assert_eq!(s.len(), 3);
        assert!((s[0] - 0.5).abs() < 1e-6);
        assert!((s[1] - 1.0).abs() < 1e-6);
        assert_eq!(s[2], 2.0);
    }

    #[test]
    fn single_scale_when_range_collapses() {
        let p = DetectorParams {
            min_scale: 1.0,
            max_scale: 1.0,
            scales: 7,
            ..Default::default()
        };
        assert_eq!(p.scale_sequence(), vec![1.0]);
    }

    #[test]
    fn rejects_bad_ranges() {
        let bad = DetectorParams {
            min_scale: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = DetectorParams {
            min_scale: 2.0,
            max_scale: 1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        assert!(DetectorParams::default().validate().is_ok());
    }
}
