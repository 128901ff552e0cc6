//! Octave training: boosting with hard-negative bootstrapping and
//! reject-threshold calibration.
//!
//! Overview
//! - [`OctaveTrainer`] collects positives (and jittered MIP bags) plus random
//!   background windows, fits a boosted ensemble through a
//!   [`crate::boost::BoostingSolver`], then alternates hard-negative mining
//!   and refitting.
//! - [`OctaveTrainer::reject_thresholds`] calibrates one threshold per round
//!   with a [`RejectionPolicy`]; [`OctaveTrainer::write`] emits the
//!   [`crate::model::OctaveRecord`] the detector loads.
//! - The per-round scores used for calibration are computed with the same
//!   tree walk and summation order the detector uses at `rel_scale = 1`.

pub mod octave;
pub mod options;
pub mod thresholds;

use serde::Serialize;

pub use octave::OctaveTrainer;
pub use options::{RejectionPolicy, TrainingOptions};

/// Non-fatal conditions hit while training.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum TrainingWarning {
    /// The negative pool ran out before the quota was met.
    NegativePoolExhausted { requested: usize, collected: usize },
    /// Fewer positives contained the bounding box than were requested.
    PositiveShortfall { requested: usize, collected: usize },
}

/// One hard-negative mining pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BootstrapRound {
    pub round: usize,
    /// Windows scored by the current ensemble.
    pub candidates: usize,
    /// Windows the ensemble accepted and that were added as negatives.
    pub hard_negatives: usize,
    /// Accepted windows dropped because they already were negatives.
    pub repeated: usize,
    /// Negative set size after folding.
    pub negatives: usize,
    pub elapsed_ms: f64,
}

/// Summary of [`OctaveTrainer::train`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct TrainingReport {
    pub positives: usize,
    /// Jittered instances gathered for MIP, bag centres included.
    pub bag_instances: usize,
    pub negatives: usize,
    pub weak_count: usize,
    pub bootstrap: Vec<BootstrapRound>,
    pub warnings: Vec<TrainingWarning>,
    pub elapsed_ms: f64,
}
