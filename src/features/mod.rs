//! Capability traits consumed by training: feature pools and datasets.
//!
//! The trainer only ever talks to these traits; [`IcfFeaturePool`] and
//! [`InMemoryDataset`] are the stock implementations.

pub mod dataset;
pub mod icf;

use crate::channels::Channels;
use crate::error::Result;
use crate::image::{ImageU8, OwnedImageU8};
use crate::types::Rect;
use serde::{Deserialize, Serialize};

pub use dataset::InMemoryDataset;
pub use icf::IcfFeaturePool;

/// Persisted description of one channel feature: a rectangle sum over one
/// integral channel, in shrunk template coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub channel: usize,
    pub rect: Rect,
}

/// Evaluates and serializes features over preprocessed samples.
pub trait FeaturePool: Sync {
    /// Number of features in the pool.
    fn size(&self) -> usize;

    /// Response of `feature` on the sample whose integrals are `integrals`.
    fn apply(&self, feature: usize, integrals: &Channels) -> f32;

    /// Metadata the detector needs to evaluate `index` again.
    fn write(&self, index: usize) -> FeatureRecord;

    /// Turn a template-sized frame into integrals.
    fn preprocess(&self, frame: &ImageU8<'_>) -> Result<Channels>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    Positive,
    Negative,
}

/// Source of labeled training images.
pub trait Dataset: Sync {
    fn get(&self, kind: SampleType, index: usize) -> Result<OwnedImageU8>;
    fn available(&self, kind: SampleType) -> usize;
}
