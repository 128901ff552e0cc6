//! Serializable diagnostics returned by the detector.
//!
//! `DetectionReport` bundles the final and raw detections with per-level
//! window statistics and a stage timing trace.

pub mod detection;
pub mod timing;

pub use detection::{DetectionReport, InputDescriptor, LevelReport};
pub use timing::{StageTiming, TimingBreakdown};
