#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod image;
pub mod model;
pub mod suppress;
pub mod types;

// Training-side modules and their capability traits.
pub mod boost;
pub mod cancel;
pub mod features;
pub mod training;

// Lower-level building blocks; public for tools, unstable.
pub mod channels;
pub mod config;

// --- High-level re-exports -------------------------------------------------

// Main entry points: model + detector + results.
pub use crate::detector::{DetectorParams, EvaluationMode, SoftCascadeDetector};
pub use crate::error::{CascadeError, Result};
pub use crate::model::{CascadeModel, ModelDocument, OctaveRecord};
pub use crate::suppress::{suppress, RejectionCriterion, Suppressor};
pub use crate::types::{Detection, Rect};

// Training.
pub use crate::training::{OctaveTrainer, RejectionPolicy, TrainingOptions, TrainingReport};

// Channels, features and datasets.
pub use crate::channels::{ChannelComputer, Channels};
pub use crate::features::{Dataset, FeaturePool, IcfFeaturePool, InMemoryDataset, SampleType};

pub use crate::cancel::CancelCheck;
pub use crate::diagnostics::DetectionReport;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use soft_cascade::prelude::*;
///
/// # fn main() -> soft_cascade::Result<()> {
/// let (w, h) = (640usize, 480usize);
/// let gray = vec![0u8; w * h];
/// let img = ImageU8::gray(w, h, &gray);
///
/// let model = CascadeModel::from_json_file("model.json".as_ref())?;
/// let detector = SoftCascadeDetector::new(model);
/// for det in detector.detect(&img, &[])? {
///     println!("{:?} score={:.3}", det.bbox, det.confidence);
/// }
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{ImageU8, OwnedImageU8};
    pub use crate::{
        CascadeModel, Detection, DetectorParams, Rect, RejectionCriterion, SoftCascadeDetector,
    };
}
