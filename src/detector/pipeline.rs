//! Detector pipeline: channels → levels → window scan → suppression.
//!
//! Typical usage:
//! ```no_run
//! use soft_cascade::{CascadeModel, SoftCascadeDetector};
//! use soft_cascade::image::ImageU8;
//!
//! # fn example(frame: ImageU8) -> soft_cascade::Result<()> {
//! let model = CascadeModel::from_json_file("model.json".as_ref())?;
//! let detector = SoftCascadeDetector::new(model);
//! for det in detector.detect(&frame, &[])? {
//!     println!("{:?} {:.3}", det.bbox, det.confidence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Stages
//! - Levels: the model's scale sequence, each mapped to its nearest octave
//!   with rescaled features (`levels`).
//! - Channels: full-frame integrals once per distinct octave shrinkage
//!   (`workspace`).
//! - Scan: every window one shrunk pixel apart, trees in trained order,
//!   early exit on the first failed threshold (`evaluate`).
//! - Suppression: the model's rejection criterion over the raw detections.

use super::evaluate::{evaluate_window, EvaluationMode};
use super::levels::{compute_levels, Level};
use super::workspace::DetectorWorkspace;
use crate::cancel::{CancelCheck, NeverCancel};
use crate::channels::Channels;
use crate::diagnostics::{DetectionReport, InputDescriptor, LevelReport, TimingBreakdown};
use crate::error::{CascadeError, Result};
use crate::image::ImageU8;
use crate::model::CascadeModel;
use crate::suppress::Suppressor;
use crate::types::{Detection, Rect};
use log::debug;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Multi-scale soft cascade detector. Immutable after construction; one
/// instance may serve concurrent callers.
#[derive(Clone, Debug)]
pub struct SoftCascadeDetector {
    model: CascadeModel,
    suppressor: Suppressor,
}

struct ScanResult {
    detections: Vec<Detection>,
    levels: Vec<LevelReport>,
    skipped_scales: Vec<f32>,
    timings: TimingBreakdown,
}

impl SoftCascadeDetector {
    /// Detector suppressing with the model's own rejection criterion.
    pub fn new(model: CascadeModel) -> Self {
        let suppressor = Suppressor::new(model.params().rejection);
        Self { model, suppressor }
    }

    /// Override the suppression stage (criterion, overlap measure, threshold).
    pub fn with_suppressor(mut self, suppressor: Suppressor) -> Self {
        self.suppressor = suppressor;
        self
    }

    pub fn model(&self) -> &CascadeModel {
        &self.model
    }

    pub fn suppressor(&self) -> &Suppressor {
        &self.suppressor
    }

    /// Detect objects in `image`. Windows intersecting no ROI are skipped; an
    /// empty ROI list scans the whole frame.
    pub fn detect(&self, image: &ImageU8<'_>, rois: &[Rect]) -> Result<Vec<Detection>> {
        self.detect_with_cancel(image, rois, &NeverCancel)
    }

    /// [`SoftCascadeDetector::detect`] as parallel arrays of boxes and
    /// confidences.
    pub fn detect_rects(
        &self,
        image: &ImageU8<'_>,
        rois: &[Rect],
    ) -> Result<(Vec<Rect>, Vec<f32>)> {
        Ok(self
            .detect(image, rois)?
            .into_iter()
            .map(|d| (d.bbox, d.confidence))
            .unzip())
    }

    /// [`SoftCascadeDetector::detect`] polling `cancel` between levels.
    pub fn detect_with_cancel(
        &self,
        image: &ImageU8<'_>,
        rois: &[Rect],
        cancel: &dyn CancelCheck,
    ) -> Result<Vec<Detection>> {
        let scan = self.scan(image, rois, EvaluationMode::EarlyExit, cancel)?;
        Ok(self.suppressor.apply(scan.detections))
    }

    /// Raw detections before suppression, ordered by level then row-major
    /// window position.
    pub fn detect_raw(
        &self,
        image: &ImageU8<'_>,
        rois: &[Rect],
        mode: EvaluationMode,
    ) -> Result<Vec<Detection>> {
        Ok(self.scan(image, rois, mode, &NeverCancel)?.detections)
    }

    /// Detect and return per-level statistics and stage timings.
    pub fn detect_with_report(
        &self,
        image: &ImageU8<'_>,
        rois: &[Rect],
    ) -> Result<(Vec<Detection>, DetectionReport)> {
        let total_start = Instant::now();
        let ScanResult {
            detections: raw,
            levels,
            skipped_scales,
            mut timings,
        } = self.scan(image, rois, EvaluationMode::EarlyExit, &NeverCancel)?;

        let nms_start = Instant::now();
        let detections = self.suppressor.apply(raw.clone());
        timings.push("suppress", nms_start.elapsed().as_secs_f64() * 1000.0);
        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;

        let report = DetectionReport {
            input: InputDescriptor {
                width: image.w,
                height: image.h,
                channels: image.channels,
                rois: rois.to_vec(),
            },
            levels,
            skipped_scales,
            raw_detections: raw,
            detections: detections.clone(),
            timings,
        };
        Ok((detections, report))
    }

    fn scan(
        &self,
        image: &ImageU8<'_>,
        rois: &[Rect],
        mode: EvaluationMode,
        cancel: &dyn CancelCheck,
    ) -> Result<ScanResult> {
        if self.model.is_empty() {
            return Err(CascadeError::ModelNotLoaded);
        }
        image.validate()?;
        if let Some(r) = rois.iter().find(|r| r.is_empty()) {
            return Err(CascadeError::invalid(format!("ROI {r:?} has no area")));
        }

        let mut timings = TimingBreakdown::default();
        let levels_start = Instant::now();
        let (levels, skipped_scales) = compute_levels(&self.model, image.w, image.h);
        timings.push("levels", levels_start.elapsed().as_secs_f64() * 1000.0);

        let mut workspace = DetectorWorkspace::new();
        for level in &levels {
            workspace.ensure(&self.model.channel_computer(level.shrinkage), image)?;
        }
        for &(shrinkage, ms) in workspace.timings_ms() {
            timings.push(format!("channels[s={shrinkage}]"), ms);
        }

        let scan_start = Instant::now();
        let run = |level: &Level| -> Result<(Vec<Detection>, LevelReport)> {
            if cancel.is_cancelled() {
                return Err(CascadeError::Cancelled);
            }
            let channels = workspace
                .get(level.shrinkage)
                .ok_or_else(|| CascadeError::invalid("channels missing for level"))?;
            Ok(self.scan_level(level, channels, rois, mode))
        };
        #[cfg(feature = "parallel")]
        let per_level: Vec<Result<(Vec<Detection>, LevelReport)>> =
            levels.par_iter().map(run).collect();
        #[cfg(not(feature = "parallel"))]
        let per_level: Vec<Result<(Vec<Detection>, LevelReport)>> =
            levels.iter().map(run).collect();

        let mut detections = Vec::new();
        let mut reports = Vec::with_capacity(levels.len());
        for result in per_level {
            let (mut dets, report) = result?;
            detections.append(&mut dets);
            reports.push(report);
        }
        timings.push("scan", scan_start.elapsed().as_secs_f64() * 1000.0);

        debug!(
            "SoftCascadeDetector: {} levels ({} scales skipped), {} raw detections",
            levels.len(),
            skipped_scales.len(),
            detections.len()
        );
        Ok(ScanResult {
            detections,
            levels: reports,
            skipped_scales,
            timings,
        })
    }

    fn scan_level(
        &self,
        level: &Level,
        channels: &Channels,
        rois: &[Rect],
        mode: EvaluationMode,
    ) -> (Vec<Detection>, LevelReport) {
        let octave = &self.model.octaves()[level.octave];
        let mut report = LevelReport {
            scale: level.scale,
            octave: level.octave,
            rel_scale: level.rel_scale,
            object_width: level.object_width,
            object_height: level.object_height,
            positions: level.positions(),
            ..Default::default()
        };
        let mut detections = Vec::new();
        for dy in 0..level.rows {
            for dx in 0..level.cols {
                let bbox = level.window_rect(dx, dy);
                if !rois.is_empty() && !rois.iter().any(|r| r.intersects(&bbox)) {
                    report.skipped += 1;
                    continue;
                }
                report.evaluated += 1;
                let outcome = evaluate_window(octave, level, channels, dx, dy, mode);
                report.weak_evaluations += outcome.weaks as u64;
                if let Some(score) = outcome.score {
                    report.accepted += 1;
                    detections.push(Detection::with_kind(bbox, score, octave.kind()));
                }
            }
        }
        debug!(
            "level scale {:.3} (octave {}, rel {:.3}): {} windows, {} accepted, {:.1} weaks/window",
            level.scale,
            level.octave,
            level.rel_scale,
            report.evaluated,
            report.accepted,
            if report.evaluated > 0 {
                report.weak_evaluations as f64 / report.evaluated as f64
            } else {
                0.0
            }
        );
        (detections, report)
    }
}
