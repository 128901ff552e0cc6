//! Knobs for octave training and reject-threshold calibration.
use crate::types::Detection;
use serde::{Deserialize, Serialize};

/// How per-round rejection thresholds are derived from the positives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionPolicy {
    /// Direct backward pruning: keep every accepted positive alive.
    #[default]
    Dbp,
    /// Multiple-instance pruning over bags of jittered positives.
    Mip,
    /// Fixed miss-rate budget spread linearly over the rounds.
    Heuristic,
}

/// Octave training parameters not fixed by [`super::OctaveTrainer::new`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    /// Class tag written into the octave.
    pub kind: i32,
    /// Hard-negative mining passes after the initial fit.
    pub bootstrap_rounds: usize,
    /// Random windows examined per mining pass.
    pub mining_attempts: usize,
    /// Negative sampling gives up after `factor × quota` random draws.
    pub negative_attempt_factor: usize,
    /// MIP bag half-extent, in shrinkage steps.
    pub bag_radius: usize,
    /// Fraction of positives the heuristic policy may reject in total.
    pub heuristic_miss_rate: f32,
    pub seed: u64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            kind: Detection::PEDESTRIAN,
            bootstrap_rounds: 2,
            mining_attempts: 10_000,
            negative_attempt_factor: 10,
            bag_radius: 1,
            heuristic_miss_rate: 0.05,
            seed: 0x5eed,
        }
    }
}
