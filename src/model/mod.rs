//! Loaded cascade: scale-ordered octaves plus global detection parameters.
//!
//! [`CascadeModel::load`] validates a [`ModelDocument`] once so the detector's
//! inner loop can index trees, features and channels without checks.

mod document;

pub use document::{ModelDocument, OctaveRecord, TreeRecord};

use crate::boost::DecisionTree;
use crate::channels::{channel_count, ChannelComputer};
use crate::detector::DetectorParams;
use crate::error::{CascadeError, Result};
use crate::features::FeatureRecord;
use crate::types::Rect;
use std::path::Path;

/// One trained scale band, immutable after load.
#[derive(Clone, Debug, PartialEq)]
pub struct Octave {
    log_scale: i32,
    scale: f32,
    shrinkage: usize,
    window: Rect,
    kind: i32,
    trees: Vec<DecisionTree>,
    thresholds: Vec<f32>,
    features: Vec<FeatureRecord>,
}

impl Octave {
    pub fn log_scale(&self) -> i32 {
        self.log_scale
    }

    /// `2^log_scale`.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn shrinkage(&self) -> usize {
        self.shrinkage
    }

    /// Training window size in pixels, anchored at the origin.
    pub fn window(&self) -> Rect {
        self.window
    }

    pub fn kind(&self) -> i32 {
        self.kind
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    pub fn features(&self) -> &[FeatureRecord] {
        &self.features
    }

    /// Template size in shrunk pixels.
    pub fn shrunk_size(&self) -> (usize, usize) {
        (
            self.window.width as usize / self.shrinkage,
            self.window.height as usize / self.shrinkage,
        )
    }

    fn from_record(index: usize, rec: &OctaveRecord, bins: usize) -> Result<Self> {
        let bad = |msg: String| CascadeError::malformed(format!("octave {index}: {msg}"));

        if rec.shrinkage == 0 {
            return Err(bad("shrinkage is zero".into()));
        }
        let (bw, bh) = (rec.bounding_box.width, rec.bounding_box.height);
        if bw < rec.shrinkage as i32 || bh < rec.shrinkage as i32 {
            return Err(bad(format!(
                "window {bw}x{bh} smaller than one {}px shrinkage block",
                rec.shrinkage
            )));
        }
        let scale = 2f32.powi(rec.log_scale);
        if !scale.is_normal() {
            return Err(bad(format!("log_scale {} out of range", rec.log_scale)));
        }
        if rec.trees.is_empty() {
            return Err(bad("octave has no trees".into()));
        }
        if rec.thresholds.len() != rec.trees.len() {
            return Err(bad(format!(
                "{} thresholds for {} trees",
                rec.thresholds.len(),
                rec.trees.len()
            )));
        }
        if let Some(t) = rec.thresholds.iter().find(|t| !t.is_finite()) {
            return Err(bad(format!("non-finite rejection threshold {t}")));
        }

        let template = Rect::new(
            0,
            0,
            bw / rec.shrinkage as i32,
            bh / rec.shrinkage as i32,
        );
        let nchannels = channel_count(bins);
        for (fi, f) in rec.features.iter().enumerate() {
            if f.channel >= nchannels {
                return Err(bad(format!(
                    "feature {fi} uses channel {} of {nchannels}",
                    f.channel
                )));
            }
            if f.rect.is_empty() || !template.contains_rect(&f.rect) {
                return Err(bad(format!(
                    "feature {fi} rect {:?} outside the {}x{} shrunk template",
                    f.rect, template.width, template.height
                )));
            }
        }

        let mut trees = Vec::with_capacity(rec.trees.len());
        for (ti, t) in rec.trees.iter().enumerate() {
            if let Some(node) = t.nodes.iter().find(|n| n.feature >= rec.features.len()) {
                return Err(bad(format!(
                    "tree {ti} references feature {} of {}",
                    node.feature,
                    rec.features.len()
                )));
            }
            if t.nodes.iter().any(|n| !n.threshold.is_finite())
                || t.leaves.iter().any(|v| !v.is_finite())
            {
                return Err(bad(format!("tree {ti} has non-finite values")));
            }
            let tree = DecisionTree::new(t.depth, t.nodes.clone(), t.leaves.clone()).ok_or_else(
                || {
                    bad(format!(
                        "tree {ti}: {} nodes / {} leaves do not match depth {}",
                        t.nodes.len(),
                        t.leaves.len(),
                        t.depth
                    ))
                },
            )?;
            trees.push(tree);
        }

        Ok(Self {
            log_scale: rec.log_scale,
            scale,
            shrinkage: rec.shrinkage,
            window: Rect::new(0, 0, bw, bh),
            kind: rec.kind,
            trees,
            thresholds: rec.thresholds.clone(),
            features: rec.features.clone(),
        })
    }

    fn to_record(&self) -> OctaveRecord {
        OctaveRecord {
            log_scale: self.log_scale,
            shrinkage: self.shrinkage,
            bounding_box: self.window,
            kind: self.kind,
            trees: self
                .trees
                .iter()
                .map(|t| TreeRecord {
                    depth: t.depth(),
                    nodes: t.splits().to_vec(),
                    leaves: t.leaves().to_vec(),
                })
                .collect(),
            thresholds: self.thresholds.clone(),
            features: self.features.clone(),
        }
    }
}

/// Validated soft cascade ready for detection.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeModel {
    params: DetectorParams,
    bins: usize,
    octaves: Vec<Octave>,
}

impl CascadeModel {
    pub fn load(doc: &ModelDocument) -> Result<Self> {
        doc.detector.validate()?;
        if doc.hog_bins == 0 || doc.hog_bins > u8::MAX as usize {
            return Err(CascadeError::malformed(format!(
                "hog_bins must be in 1..=255, got {}",
                doc.hog_bins
            )));
        }
        let mut octaves = Vec::with_capacity(doc.octaves.len());
        for (i, rec) in doc.octaves.iter().enumerate() {
            if let Some(prev) = octaves.last().map(|o: &Octave| o.log_scale) {
                if rec.log_scale <= prev {
                    return Err(CascadeError::malformed(format!(
                        "octave {i}: log_scale {} does not follow {}",
                        rec.log_scale, prev
                    )));
                }
            }
            octaves.push(Octave::from_record(i, rec, doc.hog_bins)?);
        }
        log::debug!(
            "CascadeModel::load {} octaves, {} trees, scales {}..{} x{}",
            octaves.len(),
            octaves.iter().map(|o| o.trees.len()).sum::<usize>(),
            doc.detector.min_scale,
            doc.detector.max_scale,
            doc.detector.scales
        );
        Ok(Self {
            params: doc.detector,
            bins: doc.hog_bins,
            octaves,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: ModelDocument =
            serde_json::from_str(json).map_err(|e| CascadeError::malformed(e.to_string()))?;
        Self::load(&doc)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn to_document(&self) -> ModelDocument {
        ModelDocument {
            detector: self.params,
            hog_bins: self.bins,
            octaves: self.octaves.iter().map(Octave::to_record).collect(),
        }
    }

    /// Replace the global parameters, e.g. to sweep a different scale range.
    pub fn with_params(mut self, params: DetectorParams) -> Result<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn octaves(&self) -> &[Octave] {
        &self.octaves
    }

    pub fn is_empty(&self) -> bool {
        self.octaves.is_empty()
    }

    /// Channel computer matching the model's bin count.
    pub fn channel_computer(&self, shrinkage: usize) -> ChannelComputer {
        ChannelComputer::new(shrinkage).with_bins(self.bins)
    }

    /// Index of the octave whose log2 scale is closest to `log2(scale)`;
    /// ties go to the lower octave.
    pub fn nearest_octave(&self, scale: f32) -> Option<usize> {
        if scale.is_nan() || scale <= 0.0 {
            return None;
        }
        let target = (scale as f64).log2();
        let mut best: Option<(usize, f64)> = None;
        for (i, o) in self.octaves.iter().enumerate() {
            let d = (o.log_scale as f64 - target).abs();
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }
}
