//! Per-frame channel cache keyed by shrinkage.
//!
//! Every level served by octaves with the same shrinkage reads the same
//! full-frame integrals, so each distinct shrinkage is computed once per
//! frame. Entries are computed on demand.
use crate::channels::{ChannelComputer, Channels};
use crate::error::Result;
use crate::image::ImageU8;
use log::debug;
use std::time::Instant;

#[derive(Default)]
pub(crate) struct DetectorWorkspace {
    channels: Vec<(usize, Channels)>,
    timings_ms: Vec<(usize, f64)>,
}

impl DetectorWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute channels for `computer`'s shrinkage unless already cached.
    pub fn ensure(&mut self, computer: &ChannelComputer, image: &ImageU8<'_>) -> Result<()> {
        let shrinkage = computer.shrinkage();
        if self.get(shrinkage).is_some() {
            return Ok(());
        }
        let start = Instant::now();
        let channels = computer.apply(image)?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "DetectorWorkspace: channels for shrinkage {} ({}x{}) in {:.2} ms",
            shrinkage,
            channels.width(),
            channels.height(),
            elapsed_ms
        );
        self.channels.push((shrinkage, channels));
        self.timings_ms.push((shrinkage, elapsed_ms));
        Ok(())
    }

    pub fn get(&self, shrinkage: usize) -> Option<&Channels> {
        self.channels
            .iter()
            .find(|(s, _)| *s == shrinkage)
            .map(|(_, c)| c)
    }

    /// Channel computation time per shrinkage, in computation order.
    pub fn timings_ms(&self) -> &[(usize, f64)] {
        &self.timings_ms
    }
}
