//! Boosting capability used by the octave trainer.
//!
//! The trainer does not inherit from a boosting implementation; it owns a
//! [`BoostingSolver`] and calls `fit` / `predict`. [`GentleBoost`] is the
//! stock solver: Gentle AdaBoost over depth-limited regression trees.

pub mod gentle;
pub mod tree;

use crate::error::{CascadeError, Result};
use serde::{Deserialize, Serialize};

pub use gentle::GentleBoost;
pub use tree::{DecisionTree, Split};

/// Dense `features × samples` matrix of feature responses.
#[derive(Clone, Debug, Default)]
pub struct TrainingMatrix {
    nfeatures: usize,
    nsamples: usize,
    values: Vec<f32>,
}

impl TrainingMatrix {
    /// Transpose per-sample response vectors into feature-major storage.
    pub fn from_samples<S: AsRef<[f32]>>(samples: &[S]) -> Result<Self> {
        let nsamples = samples.len();
        let nfeatures = samples.first().map_or(0, |s| s.as_ref().len());
        let mut values = vec![0.0f32; nfeatures * nsamples];
        for (si, sample) in samples.iter().enumerate() {
            let sample = sample.as_ref();
            if sample.len() != nfeatures {
                return Err(CascadeError::invalid(format!(
                    "sample {si} has {} responses, expected {nfeatures}",
                    sample.len()
                )));
            }
            for (fi, &v) in sample.iter().enumerate() {
                values[fi * nsamples + si] = v;
            }
        }
        Ok(Self {
            nfeatures,
            nsamples,
            values,
        })
    }

    pub fn nfeatures(&self) -> usize {
        self.nfeatures
    }

    pub fn nsamples(&self) -> usize {
        self.nsamples
    }

    #[inline]
    pub fn value(&self, feature: usize, sample: usize) -> f32 {
        self.values[feature * self.nsamples + sample]
    }

    /// Responses of one feature across all samples.
    #[inline]
    pub fn feature_row(&self, feature: usize) -> &[f32] {
        let start = feature * self.nsamples;
        &self.values[start..start + self.nsamples]
    }
}

/// Ordered weak learners; the score of a sample is the sum of tree outputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    pub trees: Vec<DecisionTree>,
}

impl Ensemble {
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Sum of the first `rounds` tree outputs.
    pub fn partial_score<V>(&self, mut value: V, rounds: usize) -> f32
    where
        V: FnMut(usize) -> f32,
    {
        self.trees
            .iter()
            .take(rounds)
            .map(|t| t.predict(&mut value))
            .sum()
    }

    /// Running score after every round; `trace[i]` includes tree `i`.
    pub fn trace<V>(&self, mut value: V) -> Vec<f32>
    where
        V: FnMut(usize) -> f32,
    {
        let mut acc = 0.0f32;
        self.trees
            .iter()
            .map(|t| {
                acc += t.predict(&mut value);
                acc
            })
            .collect()
    }

    /// Final binary decision: positive scores are objects.
    #[inline]
    pub fn accepts(score: f32) -> bool {
        score > 0.0
    }
}

/// Pluggable boosting back-end.
pub trait BoostingSolver: Sync {
    /// Fit `weak_count` trees of `depth` to the labelled matrix.
    fn fit(
        &self,
        data: &TrainingMatrix,
        labels: &[bool],
        weak_count: usize,
        depth: usize,
    ) -> Result<Ensemble>;

    /// Full ensemble score for one sample's responses.
    fn predict(&self, ensemble: &Ensemble, sample: &[f32]) -> f32 {
        ensemble.partial_score(|f| sample[f], ensemble.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_feature_major() {
        let m = TrainingMatrix::from_samples(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]])
            .expect("matrix");
        assert_eq!((m.nfeatures(), m.nsamples()), (2, 3));
        assert_eq!(m.feature_row(1), &[2.0, 4.0, 6.0]);
        assert_eq!(m.value(0, 2), 5.0);
    }

    #[test]
    fn ragged_samples_are_rejected() {
        assert!(TrainingMatrix::from_samples(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }

    #[test]
    fn trace_accumulates_in_order() {
        let leaf = |v: f32| DecisionTree::new(1, vec![Split::degenerate()], vec![v, v]).expect("tree");
        let e = Ensemble {
            trees: vec![leaf(1.0), leaf(-3.0), leaf(0.5)],
        };
        assert_eq!(e.trace(|_| 0.0), vec![1.0, -2.0, -1.5]);
        assert_eq!(e.partial_score(|_| 0.0, 2), -2.0);
    }
}
