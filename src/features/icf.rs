//! Integral channel feature pool: random rectangles over the HOG+Luv channels.
use super::{FeaturePool, FeatureRecord};
use crate::channels::{ChannelComputer, Channels};
use crate::error::{CascadeError, Result};
use crate::image::ImageU8;
use crate::types::Rect;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Pool of channel-rectangle features laid out on a shrunk template.
#[derive(Clone, Debug)]
pub struct IcfFeaturePool {
    template: Rect,
    computer: ChannelComputer,
    features: Vec<FeatureRecord>,
}

impl IcfFeaturePool {
    /// Draw `nfeatures` distinct random features for a `width × height`
    /// pixel template. The request is capped at the number of distinct
    /// rectangles the shrunk template admits.
    pub fn new(
        width: usize,
        height: usize,
        computer: ChannelComputer,
        nfeatures: usize,
        seed: u64,
    ) -> Result<Self> {
        let template = shrunk_template(width, height, computer.shrinkage())?;
        let (mw, mh) = (template.width as usize, template.height as usize);
        let nchannels = computer.channel_count();
        let max_pool = (mw * (mw + 1) / 2) * (mh * (mh + 1) / 2) * nchannels;
        let target = nfeatures.min(max_pool);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = HashSet::with_capacity(target);
        let mut features = Vec::with_capacity(target);
        while features.len() < target {
            let x = rng.gen_range(0..mw);
            let y = rng.gen_range(0..mh);
            let w = rng.gen_range(1..=mw - x);
            let h = rng.gen_range(1..=mh - y);
            let channel = rng.gen_range(0..nchannels);
            let f = FeatureRecord {
                channel,
                rect: Rect::new(x as i32, y as i32, w as i32, h as i32),
            };
            if seen.insert(f) {
                features.push(f);
            }
        }
        debug!(
            "IcfFeaturePool: {} features on {}x{} shrunk template ({} channels)",
            features.len(),
            mw,
            mh,
            nchannels
        );
        Ok(Self {
            template,
            computer,
            features,
        })
    }

    /// Pool with an explicit feature list, validated against the template.
    pub fn from_features(
        width: usize,
        height: usize,
        computer: ChannelComputer,
        features: Vec<FeatureRecord>,
    ) -> Result<Self> {
        let template = shrunk_template(width, height, computer.shrinkage())?;
        for (i, f) in features.iter().enumerate() {
            if f.channel >= computer.channel_count()
                || f.rect.is_empty()
                || !template.contains_rect(&f.rect)
            {
                return Err(CascadeError::invalid(format!(
                    "feature {i} {f:?} does not fit the {}x{} template",
                    template.width, template.height
                )));
            }
        }
        Ok(Self {
            template,
            computer,
            features,
        })
    }

    pub fn features(&self) -> &[FeatureRecord] {
        &self.features
    }

    pub fn computer(&self) -> &ChannelComputer {
        &self.computer
    }

    /// Template size in shrunk pixels.
    pub fn template(&self) -> Rect {
        self.template
    }
}

fn shrunk_template(width: usize, height: usize, shrinkage: usize) -> Result<Rect> {
    if shrinkage == 0 || width < shrinkage || height < shrinkage {
        return Err(CascadeError::invalid(format!(
            "template {width}x{height} too small for shrinkage {shrinkage}"
        )));
    }
    Ok(Rect::new(
        0,
        0,
        (width / shrinkage) as i32,
        (height / shrinkage) as i32,
    ))
}

impl FeaturePool for IcfFeaturePool {
    fn size(&self) -> usize {
        self.features.len()
    }

    #[inline]
    fn apply(&self, feature: usize, integrals: &Channels) -> f32 {
        let f = &self.features[feature];
        integrals.sum(f.channel, &f.rect, 0, 0) as f32
    }

    fn write(&self, index: usize) -> FeatureRecord {
        self.features[index]
    }

    fn preprocess(&self, frame: &ImageU8<'_>) -> Result<Channels> {
        let channels = self.computer.apply(frame)?;
        if (channels.width() as i32) < self.template.width
            || (channels.height() as i32) < self.template.height
        {
            return Err(CascadeError::invalid(format!(
                "frame {}x{} smaller than the feature template",
                frame.w, frame.h
            )));
        }
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_pool_is_distinct_and_in_bounds() {
        let pool = IcfFeaturePool::new(16, 32, ChannelComputer::new(4), 150, 7).expect("pool");
        assert_eq!(pool.size(), 150);
        let unique: HashSet<_> = pool.features().iter().collect();
        assert_eq!(unique.len(), 150);
        for f in pool.features() {
            assert!(pool.template().contains_rect(&f.rect));
            assert!(f.channel < 10);
        }
    }

    #[test]
    fn pool_is_capped_by_template() {
        // 1x1 shrunk template: one rectangle per channel
        let pool = IcfFeaturePool::new(4, 4, ChannelComputer::new(4), 1000, 1).expect("pool");
        assert_eq!(pool.size(), 10);
    }

    #[test]
    fn same_seed_same_pool() {
        let a = IcfFeaturePool::new(16, 32, ChannelComputer::new(4), 40, 11).expect("pool");
        let b = IcfFeaturePool::new(16, 32, ChannelComputer::new(4), 40, 11).expect("pool");
        assert_eq!(a.features(), b.features());
    }

    #[test]
    fn explicit_features_are_validated() {
        let bad = vec![FeatureRecord {
            channel: 0,
            rect: Rect::new(3, 0, 2, 1),
        }];
        assert!(IcfFeaturePool::from_features(16, 16, ChannelComputer::new(4), bad).is_err());
    }
}
