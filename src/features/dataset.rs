use super::{Dataset, SampleType};
use crate::error::{CascadeError, Result};
use crate::image::OwnedImageU8;

/// Dataset backed by owned images held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDataset {
    positives: Vec<OwnedImageU8>,
    negatives: Vec<OwnedImageU8>,
}

impl InMemoryDataset {
    pub fn new(positives: Vec<OwnedImageU8>, negatives: Vec<OwnedImageU8>) -> Self {
        Self {
            positives,
            negatives,
        }
    }

    pub fn push(&mut self, kind: SampleType, image: OwnedImageU8) {
        match kind {
            SampleType::Positive => self.positives.push(image),
            SampleType::Negative => self.negatives.push(image),
        }
    }

    fn pool(&self, kind: SampleType) -> &[OwnedImageU8] {
        match kind {
            SampleType::Positive => &self.positives,
            SampleType::Negative => &self.negatives,
        }
    }
}

impl Dataset for InMemoryDataset {
    fn get(&self, kind: SampleType, index: usize) -> Result<OwnedImageU8> {
        self.pool(kind).get(index).cloned().ok_or_else(|| {
            CascadeError::invalid(format!(
                "{kind:?} sample {index} out of range ({} available)",
                self.available(kind)
            ))
        })
    }

    fn available(&self, kind: SampleType) -> usize {
        self.pool(kind).len()
    }
}
