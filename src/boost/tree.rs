//! Complete binary decision trees shared by training and detection.
//!
//! Internal nodes are stored breadth-first (children of `i` at `2i+1` /
//! `2i+2`); a sample goes right when its feature value is `>=` the split
//! threshold. Leaves follow in left-to-right order.
use serde::{Deserialize, Serialize};

/// Split on one feature. `threshold == f32::MAX` sends every sample left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub feature: usize,
    pub threshold: f32,
}

impl Split {
    /// Split that never routes right; used when a node cannot be divided.
    pub const fn degenerate() -> Self {
        Self {
            feature: 0,
            threshold: f32::MAX,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    depth: usize,
    splits: Vec<Split>,
    leaves: Vec<f32>,
}

impl DecisionTree {
    /// Returns `None` unless `splits.len() == 2^depth - 1` and
    /// `leaves.len() == 2^depth`.
    pub fn new(depth: usize, splits: Vec<Split>, leaves: Vec<f32>) -> Option<Self> {
        if depth == 0 || depth > 16 {
            return None;
        }
        let nleaves = 1usize << depth;
        (splits.len() == nleaves - 1 && leaves.len() == nleaves).then_some(Self {
            depth,
            splits,
            leaves,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn leaves(&self) -> &[f32] {
        &self.leaves
    }

    pub(crate) fn splits_mut(&mut self) -> &mut [Split] {
        &mut self.splits
    }

    /// Walk the tree; `goes_right` decides each visited split.
    #[inline]
    pub fn leaf_index<F>(&self, mut goes_right: F) -> usize
    where
        F: FnMut(&Split) -> bool,
    {
        let mut node = 0usize;
        for _ in 0..self.depth {
            let split = &self.splits[node];
            node = 2 * node + if goes_right(split) { 2 } else { 1 };
        }
        node - self.splits.len()
    }

    /// Leaf value reached with custom split decisions.
    #[inline]
    pub fn predict_with<F>(&self, goes_right: F) -> f32
    where
        F: FnMut(&Split) -> bool,
    {
        self.leaves[self.leaf_index(goes_right)]
    }

    /// Leaf value for a sample given as a feature lookup.
    #[inline]
    pub fn predict<V>(&self, mut value: V) -> f32
    where
        V: FnMut(usize) -> f32,
    {
        self.predict_with(|s| value(s.feature) >= s.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth2() -> DecisionTree {
        DecisionTree::new(
            2,
            vec![
                Split { feature: 0, threshold: 5.0 },
                Split { feature: 1, threshold: 1.0 },
                Split { feature: 2, threshold: 1.0 },
            ],
            vec![-2.0, -1.0, 1.0, 2.0],
        )
        .expect("consistent tree")
    }

    #[test]
    fn routes_by_threshold() {
        let t = depth2();
        assert_eq!(t.predict(|f| [0.0, 0.0, 9.0][f]), -2.0);
        assert_eq!(t.predict(|f| [0.0, 1.0, 9.0][f]), -1.0);
        assert_eq!(t.predict(|f| [5.0, 9.0, 0.0][f]), 1.0);
        assert_eq!(t.predict(|f| [7.0, 0.0, 3.0][f]), 2.0);
    }

    #[test]
    fn rejects_inconsistent_shapes() {
        assert!(DecisionTree::new(2, vec![Split::degenerate()], vec![0.0; 4]).is_none());
        assert!(DecisionTree::new(0, vec![], vec![0.0]).is_none());
    }

    #[test]
    fn degenerate_split_goes_left() {
        let t = DecisionTree::new(1, vec![Split::degenerate()], vec![3.0, 4.0]).expect("tree");
        assert_eq!(t.predict(|_| 1e30), 3.0);
    }
}
