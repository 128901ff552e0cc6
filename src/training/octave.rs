use super::options::{RejectionPolicy, TrainingOptions};
use super::thresholds;
use super::{BootstrapRound, TrainingReport, TrainingWarning};
use crate::boost::{BoostingSolver, Ensemble, GentleBoost, Split, TrainingMatrix};
use crate::cancel::{CancelCheck, NeverCancel};
use crate::error::{CascadeError, Result};
use crate::features::{Dataset, FeaturePool, SampleType};
use crate::image::ImageU8;
use crate::model::{OctaveRecord, TreeRecord};
use crate::types::Rect;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Random windows drawn from one negative image before another is loaded.
const WINDOWS_PER_IMAGE: usize = 8;

/// Trains one scale octave of the soft cascade.
///
/// Sample feature responses are kept between calls, so
/// [`OctaveTrainer::reject_thresholds`] and [`OctaveTrainer::write`] work on
/// the exact positives the last [`OctaveTrainer::train`] saw.
pub struct OctaveTrainer {
    bounding_box: Rect,
    npositives: usize,
    nnegatives: usize,
    log_scale: i32,
    shrinkage: usize,
    options: TrainingOptions,
    solver: Box<dyn BoostingSolver>,
    positives: Vec<Vec<f32>>,
    bags: Vec<Vec<Vec<f32>>>,
    negatives: Vec<Vec<f32>>,
    /// `(image, window)` pairs already taken as negatives.
    negative_windows: HashSet<(usize, Rect)>,
    ensemble: Option<Ensemble>,
}

/// Hard negatives found by one mining pass, keyed by their source window.
type MinedWindows = Vec<((usize, Rect), Vec<f32>)>;

impl OctaveTrainer {
    /// `bounding_box` locates the object inside every positive sample; its
    /// size is the detection window of the octave.
    pub fn new(
        bounding_box: Rect,
        npositives: usize,
        nnegatives: usize,
        log_scale: i32,
        shrinkage: usize,
    ) -> Self {
        Self {
            bounding_box,
            npositives,
            nnegatives,
            log_scale,
            shrinkage,
            options: TrainingOptions::default(),
            solver: Box::new(GentleBoost),
            positives: Vec::new(),
            bags: Vec::new(),
            negatives: Vec::new(),
            negative_windows: HashSet::new(),
            ensemble: None,
        }
    }

    pub fn with_options(mut self, options: TrainingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_solver(mut self, solver: Box<dyn BoostingSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn bounding_box(&self) -> Rect {
        self.bounding_box
    }

    pub fn log_scale(&self) -> i32 {
        self.log_scale
    }

    pub fn shrinkage(&self) -> usize {
        self.shrinkage
    }

    pub fn options(&self) -> &TrainingOptions {
        &self.options
    }

    pub fn ensemble(&self) -> Option<&Ensemble> {
        self.ensemble.as_ref()
    }

    pub fn positive_count(&self) -> usize {
        self.positives.len()
    }

    pub fn negative_count(&self) -> usize {
        self.negatives.len()
    }

    /// Running scores of every collected positive under the trained ensemble.
    pub fn positive_traces(&self) -> Vec<Vec<f32>> {
        match &self.ensemble {
            Some(e) => self.positives.iter().map(|p| e.trace(|f| p[f])).collect(),
            None => Vec::new(),
        }
    }

    /// Running scores of every MIP bag instance, grouped by positive.
    pub fn bag_traces(&self) -> Vec<Vec<Vec<f32>>> {
        match &self.ensemble {
            Some(e) => self
                .bags
                .iter()
                .map(|bag| bag.iter().map(|p| e.trace(|f| p[f])).collect())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Collect samples, fit `weaks` trees of depth `tree_depth` and run the
    /// configured hard-negative bootstrap rounds.
    pub fn train(
        &mut self,
        dataset: &dyn Dataset,
        pool: &dyn FeaturePool,
        weaks: usize,
        tree_depth: usize,
    ) -> Result<TrainingReport> {
        self.train_with_cancel(dataset, pool, weaks, tree_depth, &NeverCancel)
    }

    /// [`OctaveTrainer::train`] polling `cancel` before every fit.
    pub fn train_with_cancel(
        &mut self,
        dataset: &dyn Dataset,
        pool: &dyn FeaturePool,
        weaks: usize,
        tree_depth: usize,
        cancel: &dyn CancelCheck,
    ) -> Result<TrainingReport> {
        let start = Instant::now();
        self.validate(pool)?;
        self.positives.clear();
        self.bags.clear();
        self.negatives.clear();
        self.negative_windows.clear();
        self.ensemble = None;

        let mut report = TrainingReport {
            weak_count: weaks,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(self.options.seed);

        self.collect_positives(dataset, pool, &mut report)?;
        report.positives = self.positives.len();
        report.bag_instances = self.bags.iter().map(Vec::len).sum();
        self.collect_negatives(dataset, pool, &mut rng, &mut report)?;
        debug!(
            "OctaveTrainer[{}]: {} positives ({} bag instances), {} negatives, {} features",
            self.log_scale,
            report.positives,
            report.bag_instances,
            self.negatives.len(),
            pool.size()
        );

        if cancel.is_cancelled() {
            return Err(CascadeError::Cancelled);
        }
        let mut ensemble = self.fit(weaks, tree_depth)?;

        for round in 1..=self.options.bootstrap_rounds {
            if cancel.is_cancelled() {
                return Err(CascadeError::Cancelled);
            }
            let round_start = Instant::now();
            let (candidates, mined_windows) = self.mine(dataset, pool, &ensemble, &mut rng)?;
            let (hard, repeated) = self.take_unseen(mined_windows);
            let mined = hard.len();
            if mined > 0 {
                self.fold_negatives(hard, &ensemble);
                ensemble = self.fit(weaks, tree_depth)?;
            }
            let entry = BootstrapRound {
                round,
                candidates,
                hard_negatives: mined,
                repeated,
                negatives: self.negatives.len(),
                elapsed_ms: round_start.elapsed().as_secs_f64() * 1000.0,
            };
            debug!(
                "OctaveTrainer[{}] bootstrap {}: {} hard of {} candidates, {} negatives ({:.1} ms)",
                self.log_scale,
                round,
                mined,
                candidates,
                entry.negatives,
                entry.elapsed_ms
            );
            report.bootstrap.push(entry);
            if mined == 0 {
                break;
            }
        }

        self.ensemble = Some(ensemble);
        report.negatives = self.negatives.len();
        report.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(report)
    }

    /// One rejection threshold per boosting round.
    pub fn reject_thresholds(&self, policy: RejectionPolicy) -> Result<Vec<f32>> {
        let rounds = self.trained()?.len();
        match policy {
            RejectionPolicy::Dbp => {
                thresholds::direct_backward_pruning(&self.positive_traces(), rounds)
            }
            RejectionPolicy::Mip => {
                thresholds::multiple_instance_pruning(&self.bag_traces(), rounds)
            }
            RejectionPolicy::Heuristic => thresholds::heuristic(
                &self.positive_traces(),
                rounds,
                self.options.heuristic_miss_rate,
            ),
        }
    }

    /// Serialize the trained octave. Feature indices are compacted to the
    /// features the trees actually use, in first-use order.
    pub fn write(&self, pool: &dyn FeaturePool, thresholds: &[f32]) -> Result<OctaveRecord> {
        let ensemble = self.trained()?;
        if thresholds.len() != ensemble.len() {
            return Err(CascadeError::invalid(format!(
                "{} thresholds for {} trees",
                thresholds.len(),
                ensemble.len()
            )));
        }
        if let Some(t) = thresholds.iter().find(|t| !t.is_finite()) {
            return Err(CascadeError::invalid(format!("non-finite threshold {t}")));
        }

        let mut local: HashMap<usize, usize> = HashMap::new();
        let mut used: Vec<usize> = Vec::new();
        let mut trees = Vec::with_capacity(ensemble.len());
        for tree in &ensemble.trees {
            let mut nodes = Vec::with_capacity(tree.splits().len());
            for split in tree.splits() {
                if split.feature >= pool.size() {
                    return Err(CascadeError::invalid(format!(
                        "tree uses feature {} of a {}-feature pool",
                        split.feature,
                        pool.size()
                    )));
                }
                let index = *local.entry(split.feature).or_insert_with(|| {
                    used.push(split.feature);
                    used.len() - 1
                });
                nodes.push(Split {
                    feature: index,
                    threshold: split.threshold,
                });
            }
            trees.push(TreeRecord {
                depth: tree.depth(),
                nodes,
                leaves: tree.leaves().to_vec(),
            });
        }
        debug!(
            "OctaveTrainer[{}]::write {} trees over {} of {} features",
            self.log_scale,
            trees.len(),
            used.len(),
            pool.size()
        );

        Ok(OctaveRecord {
            log_scale: self.log_scale,
            shrinkage: self.shrinkage,
            bounding_box: Rect::new(0, 0, self.bounding_box.width, self.bounding_box.height),
            kind: self.options.kind,
            trees,
            thresholds: thresholds.to_vec(),
            features: used.iter().map(|&i| pool.write(i)).collect(),
        })
    }

    fn trained(&self) -> Result<&Ensemble> {
        self.ensemble
            .as_ref()
            .ok_or_else(|| CascadeError::invalid("octave has not been trained"))
    }

    fn validate(&self, pool: &dyn FeaturePool) -> Result<()> {
        let b = &self.bounding_box;
        if b.is_empty() || b.x < 0 || b.y < 0 {
            return Err(CascadeError::invalid(format!("bad bounding box {b:?}")));
        }
        let s = self.shrinkage;
        if s == 0 || (b.width as usize) < s || (b.height as usize) < s {
            return Err(CascadeError::invalid(format!(
                "bounding box {}x{} too small for shrinkage {}",
                b.width, b.height, self.shrinkage
            )));
        }
        if self.npositives == 0 || self.nnegatives == 0 {
            return Err(CascadeError::invalid(format!(
                "sample quotas must be positive, got {} / {}",
                self.npositives, self.nnegatives
            )));
        }
        if pool.size() == 0 {
            return Err(CascadeError::invalid("empty feature pool"));
        }
        Ok(())
    }

    fn collect_positives(
        &mut self,
        dataset: &dyn Dataset,
        pool: &dyn FeaturePool,
        report: &mut TrainingReport,
    ) -> Result<()> {
        let available = dataset.available(SampleType::Positive);
        let radius = self.options.bag_radius as i32;
        let step = self.shrinkage as i32;
        let bbox = self.bounding_box;
        for index in 0..available {
            if self.positives.len() >= self.npositives {
                break;
            }
            let image = dataset.get(SampleType::Positive, index)?;
            let view = image.as_view();
            let Some(crop) = view.roi(&bbox) else {
                debug!(
                    "positive {} ({}x{}) does not contain {:?}, skipped",
                    index, view.w, view.h, bbox
                );
                continue;
            };
            let centre = sample_responses(pool, &crop, self.shrinkage)?;

            let mut bag = Vec::new();
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx == 0 && dy == 0 {
                        bag.push(centre.clone());
                        continue;
                    }
                    let shifted =
                        Rect::new(bbox.x + dx * step, bbox.y + dy * step, bbox.width, bbox.height);
                    if let Some(c) = view.roi(&shifted) {
                        bag.push(sample_responses(pool, &c, self.shrinkage)?);
                    }
                }
            }
            self.positives.push(centre);
            self.bags.push(bag);
        }
        let collected = self.positives.len();
        if collected == 0 {
            return Err(CascadeError::InsufficientData(format!(
                "none of {available} positive samples contains the bounding box {bbox:?}"
            )));
        }
        if collected < self.npositives {
            warn!(
                "OctaveTrainer[{}]: only {} of {} positives contain {:?}",
                self.log_scale, collected, self.npositives, bbox
            );
            report.warnings.push(TrainingWarning::PositiveShortfall {
                requested: self.npositives,
                collected,
            });
        }
        Ok(())
    }

    fn collect_negatives(
        &mut self,
        dataset: &dyn Dataset,
        pool: &dyn FeaturePool,
        rng: &mut StdRng,
        report: &mut TrainingReport,
    ) -> Result<()> {
        let available = dataset.available(SampleType::Negative);
        if available == 0 {
            return Err(CascadeError::InsufficientData("negative pool is empty".into()));
        }
        let (bw, bh) = self.window_size();
        let budget = self.options.negative_attempt_factor.max(1) * self.nnegatives;
        let mut attempts = 0usize;
        while self.negatives.len() < self.nnegatives && attempts < budget {
            let index = rng.gen_range(0..available);
            let image = dataset.get(SampleType::Negative, index)?;
            let view = image.as_view();
            for _ in 0..WINDOWS_PER_IMAGE {
                if self.negatives.len() >= self.nnegatives || attempts >= budget {
                    break;
                }
                attempts += 1;
                let Some(rect) = random_window(rng, view.w, view.h, bw, bh) else {
                    break;
                };
                if !self.negative_windows.insert((index, rect)) {
                    continue;
                }
                if let Some(crop) = view.roi(&rect) {
                    self.negatives.push(sample_responses(pool, &crop, self.shrinkage)?);
                }
            }
        }

        let collected = self.negatives.len();
        if collected == 0 {
            return Err(CascadeError::InsufficientData(format!(
                "no {bw}x{bh} window found in {available} negative images"
            )));
        }
        if collected < self.nnegatives {
            warn!(
                "OctaveTrainer[{}]: negative pool exhausted after {} attempts, {} of {} windows",
                self.log_scale, attempts, collected, self.nnegatives
            );
            report.warnings.push(TrainingWarning::NegativePoolExhausted {
                requested: self.nnegatives,
                collected,
            });
        }
        Ok(())
    }

    /// Score random background windows; returns how many were scored and the
    /// responses of those the ensemble accepts.
    fn mine(
        &self,
        dataset: &dyn Dataset,
        pool: &dyn FeaturePool,
        ensemble: &Ensemble,
        rng: &mut StdRng,
    ) -> Result<(usize, MinedWindows)> {
        let available = dataset.available(SampleType::Negative);
        let total = self.options.mining_attempts;
        let ngroups = (total + WINDOWS_PER_IMAGE - 1) / WINDOWS_PER_IMAGE;
        let groups: Vec<(usize, u64, usize)> = (0..ngroups)
            .map(|g| {
                let count = WINDOWS_PER_IMAGE.min(total - g * WINDOWS_PER_IMAGE);
                (rng.gen_range(0..available), rng.gen::<u64>(), count)
            })
            .collect();

        let scan = |&(index, seed, count): &(usize, u64, usize)| {
            self.scan_negative(dataset, pool, index, seed, count, |resp| {
                self.solver.predict(ensemble, resp) > 0.0
            })
        };
        #[cfg(feature = "parallel")]
        let results: Vec<Result<(usize, MinedWindows)>> =
            groups.par_iter().map(scan).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<(usize, MinedWindows)>> = groups.iter().map(scan).collect();

        let mut candidates = 0usize;
        let mut hard = Vec::new();
        for r in results {
            let (scored, mut kept) = r?;
            candidates += scored;
            hard.append(&mut kept);
        }
        Ok((candidates, hard))
    }

    fn scan_negative<K>(
        &self,
        dataset: &dyn Dataset,
        pool: &dyn FeaturePool,
        index: usize,
        seed: u64,
        count: usize,
        keep: K,
    ) -> Result<(usize, MinedWindows)>
    where
        K: Fn(&[f32]) -> bool,
    {
        let image = dataset.get(SampleType::Negative, index)?;
        let view = image.as_view();
        let (bw, bh) = self.window_size();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scored = 0usize;
        let mut kept = Vec::new();
        for _ in 0..count {
            let Some(rect) = random_window(&mut rng, view.w, view.h, bw, bh) else {
                break;
            };
            let Some(crop) = view.roi(&rect) else {
                continue;
            };
            let resp = sample_responses(pool, &crop, self.shrinkage)?;
            scored += 1;
            if keep(&resp) {
                kept.push(((index, rect), resp));
            }
        }
        Ok((scored, kept))
    }

    /// Drop mined windows that are already negatives (or repeat within the
    /// pass) and cap the rest at the negative quota. Returns the new
    /// responses and how many repeats were dropped.
    fn take_unseen(&mut self, mined: MinedWindows) -> (Vec<Vec<f32>>, usize) {
        let mut hard = Vec::new();
        let mut repeated = 0usize;
        for (key, resp) in mined {
            if self.negative_windows.contains(&key) {
                repeated += 1;
            } else if hard.len() < self.nnegatives {
                self.negative_windows.insert(key);
                hard.push(resp);
            }
        }
        (hard, repeated)
    }

    /// Add hard negatives; when the quota would overflow, the existing
    /// negatives with the lowest scores are dropped first.
    fn fold_negatives(&mut self, mut hard: Vec<Vec<f32>>, ensemble: &Ensemble) {
        hard.truncate(self.nnegatives);
        let keep = self
            .nnegatives
            .saturating_sub(hard.len())
            .min(self.negatives.len());
        if keep < self.negatives.len() {
            let scores: Vec<f32> = self
                .negatives
                .iter()
                .map(|n| self.solver.predict(ensemble, n))
                .collect();
            let mut order: Vec<usize> = (0..scores.len()).collect();
            order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
            let mut retained = vec![false; scores.len()];
            for &i in &order[..keep] {
                retained[i] = true;
            }
            let old = std::mem::take(&mut self.negatives);
            self.negatives = old
                .into_iter()
                .zip(retained)
                .filter_map(|(n, r)| r.then_some(n))
                .collect();
        }
        self.negatives.extend(hard);
    }

    fn fit(&self, weaks: usize, depth: usize) -> Result<Ensemble> {
        let samples: Vec<&[f32]> = self
            .positives
            .iter()
            .chain(&self.negatives)
            .map(Vec::as_slice)
            .collect();
        let matrix = TrainingMatrix::from_samples(&samples)?;
        let labels: Vec<bool> = (0..samples.len()).map(|i| i < self.positives.len()).collect();
        self.solver.fit(&matrix, &labels, weaks, depth)
    }

    fn window_size(&self) -> (usize, usize) {
        (
            self.bounding_box.width as usize,
            self.bounding_box.height as usize,
        )
    }
}

fn sample_responses(
    pool: &dyn FeaturePool,
    crop: &ImageU8<'_>,
    shrinkage: usize,
) -> Result<Vec<f32>> {
    let channels = pool.preprocess(crop)?;
    if channels.shrinkage() != shrinkage {
        return Err(CascadeError::invalid(format!(
            "feature pool shrinks by {}, octave expects {}",
            channels.shrinkage(),
            shrinkage
        )));
    }
    Ok((0..pool.size()).map(|f| pool.apply(f, &channels)).collect())
}

fn random_window(rng: &mut StdRng, w: usize, h: usize, bw: usize, bh: usize) -> Option<Rect> {
    if w < bw || h < bh {
        return None;
    }
    let x = rng.gen_range(0..=w - bw);
    let y = rng.gen_range(0..=h - bh);
    Some(Rect::new(x as i32, y as i32, bw as i32, bh as i32))
}
