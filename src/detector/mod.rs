//! Multi-scale soft cascade detection.
//!
//! Overview
//! - The model's scale sequence (log-spaced between `min_scale` and
//!   `max_scale`) is mapped onto the nearest trained octave; each pairing is a
//!   level with features rescaled by `rel_scale = scale / octave_scale`.
//! - Integral channels are computed once per distinct octave shrinkage on the
//!   full frame and shared by every level.
//! - Each window accumulates tree outputs in trained order and is rejected
//!   as soon as the running score falls strictly below the round's threshold.
//! - Survivors are suppressed with the model's rejection criterion.
//!
//! Modules
//! - [`params`] – global detection parameters persisted with the model.
//! - `levels` – scale → octave mapping and feature/threshold rescaling.
//! - `evaluate` – per-window cascade evaluation.
//! - `workspace` – per-frame channel cache.
//! - `pipeline` – the public [`SoftCascadeDetector`].

mod evaluate;
mod levels;
pub mod params;
mod pipeline;
mod workspace;

pub use evaluate::EvaluationMode;
pub use params::DetectorParams;
pub use pipeline::SoftCascadeDetector;
