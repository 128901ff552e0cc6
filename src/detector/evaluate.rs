//! Per-window soft cascade evaluation.
use super::levels::Level;
use crate::channels::Channels;
use crate::model::Octave;
use serde::{Deserialize, Serialize};

/// Whether window evaluation stops at the first failed threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Abandon a window as soon as its running score drops below a threshold.
    #[default]
    EarlyExit,
    /// Evaluate every tree; rejection is decided afterwards. Same survivors,
    /// same confidences, slower.
    Exhaustive,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct WindowOutcome {
    /// Final score, `None` when some threshold rejected the window.
    pub score: Option<f32>,
    /// Trees evaluated before stopping.
    pub weaks: u32,
}

/// Run the octave's trees in trained order on the window at `(dx, dy)`.
#[inline]
pub(crate) fn evaluate_window(
    octave: &Octave,
    level: &Level,
    channels: &Channels,
    dx: usize,
    dy: usize,
    mode: EvaluationMode,
) -> WindowOutcome {
    let mut score = 0.0f32;
    let mut rejected = false;
    let mut weaks = 0u32;
    for (tree, &threshold) in octave.trees().iter().zip(octave.thresholds()) {
        score += tree.predict_with(|split| {
            let f = &level.features[split.feature];
            channels.sum(f.channel, &f.rect, dx, dy) as f32 >= split.threshold * f.factor
        });
        weaks += 1;
        if score < threshold {
            rejected = true;
            if mode == EvaluationMode::EarlyExit {
                break;
            }
        }
    }
    WindowOutcome {
        score: (!rejected).then_some(score),
        weaks,
    }
}
