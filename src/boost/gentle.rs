//! Gentle AdaBoost over complete regression trees.
//!
//! Each round fits a depth-`d` tree to the ±1 labels by weighted least
//! squares: splits maximise `S_L²/W_L + S_R²/W_R` (weighted label sums and
//! weights of both sides), leaves hold the weighted mean label. Sample
//! weights are then multiplied by `exp(-y·f(x))` and renormalised.
//!
//! Trees are grown level by level; every feature is swept once per level in
//! presorted order while per-node running sums are kept, so a round costs
//! `O(depth · features · samples)`.
use super::{BoostingSolver, DecisionTree, Ensemble, Split, TrainingMatrix};
use crate::error::{CascadeError, Result};
use log::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Stock boosting solver used by the octave trainer.
#[derive(Clone, Copy, Debug, Default)]
pub struct GentleBoost;

#[derive(Clone, Copy, Debug)]
struct Candidate {
    gain: f64,
    feature: usize,
    threshold: f32,
}

impl GentleBoost {
    pub fn new() -> Self {
        Self
    }
}

impl BoostingSolver for GentleBoost {
    fn fit(
        &self,
        data: &TrainingMatrix,
        labels: &[bool],
        weak_count: usize,
        depth: usize,
    ) -> Result<Ensemble> {
        let n = data.nsamples();
        if labels.len() != n {
            return Err(CascadeError::invalid(format!(
                "{} labels for {} samples",
                labels.len(),
                n
            )));
        }
        if weak_count == 0 || depth == 0 || depth > 16 {
            return Err(CascadeError::invalid(format!(
                "cannot fit {weak_count} trees of depth {depth}"
            )));
        }
        if data.nfeatures() == 0 {
            return Err(CascadeError::invalid("training matrix has no features"));
        }
        let npos = labels.iter().filter(|&&l| l).count();
        let nneg = n - npos;
        if npos == 0 || nneg == 0 {
            return Err(CascadeError::InsufficientData(format!(
                "boosting needs both classes, got {npos} positives / {nneg} negatives"
            )));
        }

        let y: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { -1.0 }).collect();
        let mut weights: Vec<f64> = labels
            .iter()
            .map(|&l| if l { 0.5 / npos as f64 } else { 0.5 / nneg as f64 })
            .collect();
        let order = presort(data);

        let mut trees = Vec::with_capacity(weak_count);
        for round in 0..weak_count {
            let (tree, outputs) = grow_tree(data, &order, &y, &weights, depth)?;
            let mut total = 0.0;
            for ((w, &yi), &f) in weights.iter_mut().zip(&y).zip(&outputs) {
                *w *= (-yi * f as f64).exp();
                total += *w;
            }
            if total > 0.0 {
                weights.iter_mut().for_each(|w| *w /= total);
            }
            if round + 1 == weak_count || (round + 1) % 64 == 0 {
                let err = outputs
                    .iter()
                    .zip(&y)
                    .filter(|&(&f, &yi)| (f as f64) * yi <= 0.0)
                    .count();
                debug!(
                    "GentleBoost round {}/{}: {} of {} samples misfit by last tree",
                    round + 1,
                    weak_count,
                    err,
                    n
                );
            }
            trees.push(tree);
        }
        Ok(Ensemble { trees })
    }
}

/// Per-feature sample indices sorted by ascending response.
fn presort(data: &TrainingMatrix) -> Vec<Vec<u32>> {
    let sort_one = |f: usize| {
        let row = data.feature_row(f);
        let mut idx: Vec<u32> = (0..row.len() as u32).collect();
        idx.sort_by(|&a, &b| row[a as usize].total_cmp(&row[b as usize]));
        idx
    };
    #[cfg(feature = "parallel")]
    {
        (0..data.nfeatures()).into_par_iter().map(sort_one).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..data.nfeatures()).map(sort_one).collect()
    }
}

/// Fit one tree; returns it with its output for every training sample.
fn grow_tree(
    data: &TrainingMatrix,
    order: &[Vec<u32>],
    y: &[f64],
    weights: &[f64],
    depth: usize,
) -> Result<(DecisionTree, Vec<f32>)> {
    let n = y.len();
    let nsplits = (1usize << depth) - 1;
    let mut splits = vec![Split::degenerate(); nsplits];
    // BFS node currently holding each sample
    let mut node_of = vec![0usize; n];

    for level in 0..depth {
        let first = (1usize << level) - 1;
        let width = 1usize << level;
        let mut node_w = vec![0.0f64; width];
        let mut node_s = vec![0.0f64; width];
        for s in 0..n {
            let k = node_of[s] - first;
            node_w[k] += weights[s];
            node_s[k] += weights[s] * y[s];
        }

        let scan = |f: usize| {
            scan_feature(data, f, &order[f], &node_of, first, y, weights, &node_w, &node_s)
        };
        #[cfg(feature = "parallel")]
        let per_feature: Vec<Vec<Option<Candidate>>> =
            (0..data.nfeatures()).into_par_iter().map(scan).collect();
        #[cfg(not(feature = "parallel"))]
        let per_feature: Vec<Vec<Option<Candidate>>> = (0..data.nfeatures()).map(scan).collect();

        for k in 0..width {
            let parent = if node_w[k] > 0.0 {
                node_s[k] * node_s[k] / node_w[k]
            } else {
                0.0
            };
            // lowest feature index wins ties
            let best = per_feature
                .iter()
                .filter_map(|c| c[k])
                .filter(|c| c.gain > parent + 1e-12)
                .fold(None::<Candidate>, |acc, c| match acc {
                    Some(a) if a.gain >= c.gain => Some(a),
                    _ => Some(c),
                });
            if let Some(c) = best {
                splits[first + k] = Split {
                    feature: c.feature,
                    threshold: c.threshold,
                };
            }
        }

        for s in 0..n {
            let split = splits[node_of[s]];
            let right = data.value(split.feature, s) >= split.threshold;
            node_of[s] = 2 * node_of[s] + if right { 2 } else { 1 };
        }
    }

    let nleaves = nsplits + 1;
    let mut leaf_w = vec![0.0f64; nleaves];
    let mut leaf_s = vec![0.0f64; nleaves];
    for s in 0..n {
        let leaf = node_of[s] - nsplits;
        leaf_w[leaf] += weights[s];
        leaf_s[leaf] += weights[s] * y[s];
    }
    let leaves: Vec<f32> = leaf_w
        .iter()
        .zip(&leaf_s)
        .map(|(&w, &s)| if w > 0.0 { (s / w) as f32 } else { 0.0 })
        .collect();
    let outputs = node_of.iter().map(|&node| leaves[node - nsplits]).collect();

    let tree = DecisionTree::new(depth, splits, leaves)
        .ok_or_else(|| CascadeError::invalid(format!("unsupported tree depth {depth}")))?;
    Ok((tree, outputs))
}

/// Best split of feature `f` for every node of the current level.
#[allow(clippy::too_many_arguments)]
fn scan_feature(
    data: &TrainingMatrix,
    f: usize,
    order: &[u32],
    node_of: &[usize],
    first: usize,
    y: &[f64],
    weights: &[f64],
    node_w: &[f64],
    node_s: &[f64],
) -> Vec<Option<Candidate>> {
    let width = node_w.len();
    let row = data.feature_row(f);
    let mut best: Vec<Option<Candidate>> = vec![None; width];
    let mut left_w = vec![0.0f64; width];
    let mut left_s = vec![0.0f64; width];
    let mut prev: Vec<Option<f32>> = vec![None; width];

    for &s in order {
        let s = s as usize;
        let k = node_of[s] - first;
        let v = row[s];
        if let Some(p) = prev[k] {
            if v > p {
                let wl = left_w[k];
                let wr = node_w[k] - wl;
                if wl > 0.0 && wr > 0.0 {
                    let sl = left_s[k];
                    let sr = node_s[k] - sl;
                    let gain = sl * sl / wl + sr * sr / wr;
                    if best[k].map_or(true, |b| gain > b.gain) {
                        let mid = p + (v - p) * 0.5;
                        let threshold = if mid > p { mid } else { v };
                        best[k] = Some(Candidate {
                            gain,
                            feature: f,
                            threshold,
                        });
                    }
                }
            }
        }
        left_w[k] += weights[s];
        left_s[k] += weights[s] * y[s];
        prev[k] = Some(v);
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (TrainingMatrix, Vec<bool>) {
        // feature 1 separates the classes at 10, feature 0 is noise
        let samples = vec![
            vec![3.0, 2.0],
            vec![1.0, 4.0],
            vec![2.0, 8.0],
            vec![3.0, 12.0],
            vec![1.0, 15.0],
            vec![2.0, 30.0],
        ];
        let labels = vec![false, false, false, true, true, true];
        (TrainingMatrix::from_samples(&samples).expect("matrix"), labels)
    }

    #[test]
    fn first_split_finds_the_separating_feature() {
        let (m, labels) = separable();
        let e = GentleBoost.fit(&m, &labels, 1, 1).expect("fit");
        let split = e.trees[0].splits()[0];
        assert_eq!(split.feature, 1);
        assert!(split.threshold > 8.0 && split.threshold <= 12.0);
        assert!(e.trees[0].leaves()[0] < 0.0);
        assert!(e.trees[0].leaves()[1] > 0.0);
    }

    #[test]
    fn ensemble_classifies_training_set() {
        let (m, labels) = separable();
        let e = GentleBoost.fit(&m, &labels, 8, 2).expect("fit");
        for (s, &label) in labels.iter().enumerate() {
            let sample: Vec<f32> = (0..m.nfeatures()).map(|f| m.value(f, s)).collect();
            let score = GentleBoost.predict(&e, &sample);
            assert_eq!(Ensemble::accepts(score), label, "sample {s} score {score}");
        }
    }

    #[test]
    fn threshold_splits_adjacent_floats() {
        let a = 1.0f32;
        let b = f32::from_bits(a.to_bits() + 1);
        let m = TrainingMatrix::from_samples(&[vec![a], vec![b]]).expect("matrix");
        let e = GentleBoost.fit(&m, &[false, true], 1, 1).expect("fit");
        let t = e.trees[0].splits()[0].threshold;
        assert!(a < t && b >= t);
    }

    #[test]
    fn single_class_is_insufficient() {
        let m = TrainingMatrix::from_samples(&[vec![1.0], vec![2.0]]).expect("matrix");
        assert!(matches!(
            GentleBoost.fit(&m, &[true, true], 4, 2),
            Err(CascadeError::InsufficientData(_))
        ));
        assert!(matches!(
            GentleBoost.fit(&m, &[true, false], 0, 2),
            Err(CascadeError::InvalidInput(_))
        ));
    }
}
