//! Random-forest regressor.
//!
//! A bagged ensemble of regression trees. Each tree is fit on a bootstrap
//! sample (drawn with replacement, same size as the training set) with
//! its own deterministic RNG stream derived from the forest seed, so a
//! fit is reproducible regardless of how the trees are scheduled across
//! the rayon pool.

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use thiserror::Error;

use crate::utils::Parallelism;

use super::config::RandomForestConfig;
use super::tree::{DecisionTree, TreeParams};

/// Errors from forest fitting and prediction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("feature rows ({features}) do not match target rows ({targets})")]
    RowMismatch { features: usize, targets: usize },

    #[error("expected {expected} features per sample, got {actual}")]
    FeatureWidthMismatch { expected: usize, actual: usize },
}

// =============================================================================
// RandomForestRegressor
// =============================================================================

/// A fitted random-forest regressor.
///
/// Predictions are the unweighted mean of the per-tree predictions.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    trees: Vec<DecisionTree>,
    config: RandomForestConfig,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Fit a forest on sample-major features and scalar targets.
    ///
    /// Tree fitting fans out across the current rayon pool when
    /// `parallelism` allows it.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is empty or the feature/target row
    /// counts disagree.
    pub fn fit(
        features: ArrayView2<f32>,
        targets: ArrayView1<f32>,
        config: &RandomForestConfig,
        parallelism: Parallelism,
    ) -> Result<Self, ForestError> {
        let n_samples = features.nrows();
        if n_samples == 0 {
            return Err(ForestError::EmptyDataset);
        }
        if targets.len() != n_samples {
            return Err(ForestError::RowMismatch {
                features: n_samples,
                targets: targets.len(),
            });
        }

        let n_features = features.ncols();
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features.unwrap_or(n_features).min(n_features),
        };

        let seed = config.seed;
        let trees = parallelism.maybe_par_map(0..config.n_trees, |tree_idx| {
            let mut rng = tree_rng(seed, tree_idx);
            let indices: Vec<usize> = (0..n_samples)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();
            DecisionTree::fit(features, targets, indices, &params, &mut rng)
        });

        Ok(Self {
            trees,
            config: config.clone(),
            n_features,
        })
    }

    /// Predict targets for a batch of samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the feature width differs from the width the
    /// forest was fit on.
    pub fn predict(&self, features: ArrayView2<f32>) -> Result<Array1<f32>, ForestError> {
        if features.ncols() != self.n_features {
            return Err(ForestError::FeatureWidthMismatch {
                expected: self.n_features,
                actual: features.ncols(),
            });
        }

        let inv = 1.0 / self.trees.len() as f64;
        let predictions = features
            .rows()
            .into_iter()
            .map(|row| {
                let sum: f64 = self.trees.iter().map(|t| t.predict(row) as f64).sum();
                (sum * inv) as f32
            })
            .collect();
        Ok(predictions)
    }

    /// Number of trees in the ensemble.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Feature width the forest was fit on.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// The hyperparameters the forest was fit with.
    pub fn config(&self) -> &RandomForestConfig {
        &self.config
    }

    pub(crate) fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Rebuild a forest from persisted parts.
    pub(crate) fn from_parts(
        trees: Vec<DecisionTree>,
        config: RandomForestConfig,
        n_features: usize,
    ) -> Self {
        Self {
            trees,
            config,
            n_features,
        }
    }
}

/// Derive an independent RNG stream for one tree.
///
/// Mixing the tree index with a 64-bit odd constant decorrelates the
/// per-tree seeds even for consecutive indices.
fn tree_rng(seed: u64, tree_idx: usize) -> Xoshiro256PlusPlus {
    let derived = seed ^ (tree_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    Xoshiro256PlusPlus::seed_from_u64(derived)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{random_dense_f32, synthetic_regression_targets_linear};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1, Array2};

    fn synthetic(n: usize, f: usize, seed: u64) -> (Array2<f32>, Array1<f32>) {
        let flat = random_dense_f32(n, f, seed, -1.0, 1.0);
        let (targets, _, _) = synthetic_regression_targets_linear(&flat, n, f, seed + 1, 0.05);
        (
            Array2::from_shape_vec((n, f), flat).unwrap(),
            Array1::from_vec(targets),
        )
    }

    #[test]
    fn fit_rejects_empty() {
        let features = Array2::<f32>::zeros((0, 3));
        let targets = Array1::<f32>::zeros(0);
        let err = RandomForestRegressor::fit(
            features.view(),
            targets.view(),
            &RandomForestConfig::default(),
            Parallelism::Sequential,
        )
        .unwrap_err();
        assert_eq!(err, ForestError::EmptyDataset);
    }

    #[test]
    fn fit_rejects_row_mismatch() {
        let features = Array2::<f32>::zeros((4, 3));
        let targets = Array1::<f32>::zeros(3);
        let err = RandomForestRegressor::fit(
            features.view(),
            targets.view(),
            &RandomForestConfig::default(),
            Parallelism::Sequential,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ForestError::RowMismatch {
                features: 4,
                targets: 3
            }
        );
    }

    #[test]
    fn fit_is_deterministic_for_fixed_seed() {
        let (features, targets) = synthetic(80, 4, 3);
        let config = RandomForestConfig::builder().n_trees(10).build().unwrap();

        let a =
            RandomForestRegressor::fit(features.view(), targets.view(), &config, Parallelism::Sequential)
                .unwrap();
        let b =
            RandomForestRegressor::fit(features.view(), targets.view(), &config, Parallelism::Parallel)
                .unwrap();

        let pa = a.predict(features.view()).unwrap();
        let pb = b.predict(features.view()).unwrap();
        for (x, y) in pa.iter().zip(pb.iter()) {
            assert_abs_diff_eq!(x, y);
        }
    }

    #[test]
    fn forest_learns_a_linear_trend() {
        let (features, targets) = synthetic(200, 3, 11);
        let config = RandomForestConfig::builder()
            .n_trees(30)
            .max_depth(8)
            .build()
            .unwrap();
        let model =
            RandomForestRegressor::fit(features.view(), targets.view(), &config, Parallelism::Sequential)
                .unwrap();

        let preds = model.predict(features.view()).unwrap();
        let mse: f64 = preds
            .iter()
            .zip(targets.iter())
            .map(|(&p, &t)| {
                let d = p as f64 - t as f64;
                d * d
            })
            .sum::<f64>()
            / targets.len() as f64;
        let var: f64 = {
            let mean = targets.iter().map(|&t| t as f64).sum::<f64>() / targets.len() as f64;
            targets
                .iter()
                .map(|&t| {
                    let d = t as f64 - mean;
                    d * d
                })
                .sum::<f64>()
                / targets.len() as f64
        };
        // In-sample fit must explain most of the variance.
        assert!(mse < 0.5 * var, "mse {mse} vs variance {var}");
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let (features, targets) = synthetic(30, 3, 2);
        let config = RandomForestConfig::builder().n_trees(3).build().unwrap();
        let model =
            RandomForestRegressor::fit(features.view(), targets.view(), &config, Parallelism::Sequential)
                .unwrap();

        let narrow = array![[0.0f32, 1.0]];
        let err = model.predict(narrow.view()).unwrap_err();
        assert_eq!(
            err,
            ForestError::FeatureWidthMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn n_trees_matches_config() {
        let (features, targets) = synthetic(30, 2, 9);
        let config = RandomForestConfig::builder().n_trees(7).build().unwrap();
        let model =
            RandomForestRegressor::fit(features.view(), targets.view(), &config, Parallelism::Sequential)
                .unwrap();
        assert_eq!(model.n_trees(), 7);
        assert_eq!(model.n_features(), 2);
    }
}
