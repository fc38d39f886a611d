//! Regression decision tree.
//!
//! Trees are stored in struct-of-arrays form: one entry per node across
//! parallel vectors, children referenced by index. Splits are chosen by
//! maximizing the reduction in the sum of squared residuals; leaves hold
//! the mean target of their samples.

use ndarray::{ArrayView1, ArrayView2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Node index inside a [`DecisionTree`].
pub type NodeId = u32;

// =============================================================================
// DecisionTree
// =============================================================================

/// A fitted regression tree in SoA layout.
///
/// Internal nodes carry `(split_feature, threshold, left, right)`; leaves
/// carry a prediction in `leaf_value`. Node 0 is the root. A single-node
/// tree is a bare leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    pub(crate) split_features: Vec<u32>,
    pub(crate) thresholds: Vec<f32>,
    pub(crate) left_children: Vec<u32>,
    pub(crate) right_children: Vec<u32>,
    pub(crate) is_leaf: Vec<bool>,
    pub(crate) leaf_values: Vec<f32>,
}

impl DecisionTree {
    /// Number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Tree depth (root-only tree has depth 0).
    pub fn depth(&self) -> usize {
        fn depth_from(tree: &DecisionTree, node: NodeId) -> usize {
            if tree.is_leaf[node as usize] {
                0
            } else {
                let l = depth_from(tree, tree.left_children[node as usize]);
                let r = depth_from(tree, tree.right_children[node as usize]);
                1 + l.max(r)
            }
        }
        depth_from(self, 0)
    }

    /// Predict the target for one sample.
    ///
    /// Traverses from the root: `value < threshold` goes left, anything
    /// else (including NaN) goes right.
    pub fn predict(&self, sample: ArrayView1<f32>) -> f32 {
        let mut node = 0u32;
        while !self.is_leaf[node as usize] {
            let feature = self.split_features[node as usize] as usize;
            let value = sample[feature];
            node = if value < self.thresholds[node as usize] {
                self.left_children[node as usize]
            } else {
                self.right_children[node as usize]
            };
        }
        self.leaf_values[node as usize]
    }

    /// Rebuild a tree from its stored arrays.
    ///
    /// Used by the persistence layer. Array lengths must agree; child
    /// indices are trusted (the on-disk payload is checksummed).
    pub(crate) fn from_arrays(
        split_features: Vec<u32>,
        thresholds: Vec<f32>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f32>,
    ) -> Self {
        debug_assert_eq!(split_features.len(), is_leaf.len());
        debug_assert_eq!(thresholds.len(), is_leaf.len());
        debug_assert_eq!(left_children.len(), is_leaf.len());
        debug_assert_eq!(right_children.len(), is_leaf.len());
        debug_assert_eq!(leaf_values.len(), is_leaf.len());
        Self {
            split_features,
            thresholds,
            left_children,
            right_children,
            is_leaf,
            leaf_values,
        }
    }

    /// Fit a tree on the given bootstrap sample.
    ///
    /// `indices` are row indices into `features`/`targets`, possibly with
    /// repeats (bootstrap). The RNG drives per-split feature sampling.
    pub(crate) fn fit<'f, 't>(
        features: ArrayView2<'f, f32>,
        targets: ArrayView1<'t, f32>,
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Self {
        let mut builder = TreeBuilder {
            features,
            targets,
            params,
            tree: DecisionTree {
                split_features: Vec::new(),
                thresholds: Vec::new(),
                left_children: Vec::new(),
                right_children: Vec::new(),
                is_leaf: Vec::new(),
                leaf_values: Vec::new(),
            },
            feature_scratch: (0..features.ncols() as u32).collect(),
        };
        let mut indices = indices;
        builder.grow(&mut indices, 0, rng);
        builder.tree
    }
}

/// Per-tree growth limits, extracted from the forest config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split (already clamped to n_features).
    pub max_features: usize,
}

// =============================================================================
// Tree Growth
// =============================================================================

struct TreeBuilder<'f, 't, 'p> {
    features: ArrayView2<'f, f32>,
    targets: ArrayView1<'t, f32>,
    params: &'p TreeParams,
    tree: DecisionTree,
    feature_scratch: Vec<u32>,
}

/// Best split found for a node, if any.
struct Split {
    feature: u32,
    threshold: f32,
    /// Gain in sum-of-squares reduction over the parent node.
    gain: f64,
}

impl TreeBuilder<'_, '_, '_> {
    /// Grow the subtree over `indices`, returning its root node id.
    ///
    /// `indices` is reordered in place so that child ranges stay
    /// contiguous without extra allocation per node.
    fn grow(&mut self, indices: &mut [usize], depth: usize, rng: &mut Xoshiro256PlusPlus) -> NodeId {
        let n = indices.len();
        debug_assert!(n > 0);

        let mean = self.mean_target(indices);

        let splittable = depth < self.params.max_depth
            && n >= self.params.min_samples_split
            && n >= 2 * self.params.min_samples_leaf;

        let split = if splittable {
            self.find_best_split(indices, rng)
        } else {
            None
        };

        match split {
            None => self.push_leaf(mean),
            Some(split) => {
                // Partition in place: left = strictly below threshold.
                let features = self.features;
                let feature = split.feature as usize;
                let pivot =
                    partition_in_place(indices, |&i| features[[i, feature]] < split.threshold);
                debug_assert!(pivot > 0 && pivot < n);

                let node = self.push_branch(split.feature, split.threshold);
                let (left_indices, right_indices) = indices.split_at_mut(pivot);
                let left = self.grow(left_indices, depth + 1, rng);
                let right = self.grow(right_indices, depth + 1, rng);
                self.tree.left_children[node as usize] = left;
                self.tree.right_children[node as usize] = right;
                node
            }
        }
    }

    fn mean_target(&self, indices: &[usize]) -> f32 {
        let sum: f64 = indices.iter().map(|&i| self.targets[i] as f64).sum();
        (sum / indices.len() as f64) as f32
    }

    /// Scan the sampled feature subset for the split with the largest
    /// sum-of-squares reduction.
    ///
    /// For a candidate feature the node's samples are sorted by value and
    /// prefix sums give the left/right partition cost at every boundary in
    /// one pass. Boundaries between equal values are skipped.
    fn find_best_split(
        &mut self,
        indices: &[usize],
        rng: &mut Xoshiro256PlusPlus,
    ) -> Option<Split> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;

        // Partial Fisher-Yates: the first max_features entries become the
        // sampled feature subset.
        let n_features = self.feature_scratch.len();
        let k = self.params.max_features.min(n_features);
        for i in 0..k {
            let j = rng.gen_range(i..n_features);
            self.feature_scratch.swap(i, j);
        }

        let total_sum: f64 = indices.iter().map(|&i| self.targets[i] as f64).sum();

        let mut best: Option<Split> = None;
        let mut pairs: Vec<(f32, f32)> = Vec::with_capacity(n);

        for fi in 0..k {
            let feature = self.feature_scratch[fi] as usize;

            pairs.clear();
            pairs.extend(
                indices
                    .iter()
                    .map(|&i| (self.features[[i, feature]], self.targets[i])),
            );
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            // Constant feature on this node: nothing to split.
            if pairs[0].0 >= pairs[n - 1].0 {
                continue;
            }

            let mut left_sum = 0.0f64;
            for boundary in 1..n {
                left_sum += pairs[boundary - 1].1 as f64;

                if boundary < min_leaf || n - boundary < min_leaf {
                    continue;
                }
                let lo = pairs[boundary - 1].0;
                let hi = pairs[boundary].0;
                if lo >= hi {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let n_left = boundary as f64;
                let n_right = (n - boundary) as f64;
                // Maximizing sumL²/nL + sumR²/nR maximizes the SS reduction;
                // subtracting the parent term makes the gain comparable
                // across features.
                let gain = left_sum * left_sum / n_left + right_sum * right_sum / n_right
                    - total_sum * total_sum / n as f64;

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    // Midpoint threshold; falls back to the upper value when
                    // the midpoint rounds onto the lower one.
                    let mid = lo + (hi - lo) * 0.5;
                    let threshold = if mid > lo { mid } else { hi };
                    best = Some(Split {
                        feature: feature as u32,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn push_leaf(&mut self, value: f32) -> NodeId {
        let id = self.tree.n_nodes() as NodeId;
        self.tree.split_features.push(0);
        self.tree.thresholds.push(0.0);
        self.tree.left_children.push(0);
        self.tree.right_children.push(0);
        self.tree.is_leaf.push(true);
        self.tree.leaf_values.push(value);
        id
    }

    fn push_branch(&mut self, feature: u32, threshold: f32) -> NodeId {
        let id = self.tree.n_nodes() as NodeId;
        self.tree.split_features.push(feature);
        self.tree.thresholds.push(threshold);
        self.tree.left_children.push(0); // patched after children grow
        self.tree.right_children.push(0);
        self.tree.is_leaf.push(false);
        self.tree.leaf_values.push(0.0);
        id
    }
}

/// In-place partition; returns the pivot index.
fn partition_in_place<T, F: FnMut(&T) -> bool>(slice: &mut [T], mut pred: F) -> usize {
    let mut pivot = 0;
    for i in 0..slice.len() {
        if pred(&slice[i]) {
            slice.swap(pivot, i);
            pivot += 1;
        }
    }
    pivot
}

// =============================================================================
// Tests
// =============================================================================
