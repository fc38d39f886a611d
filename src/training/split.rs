//! Train/test splitting and cross-validation fold planning.
//!
//! Both splitters shuffle indices with a seeded [`StdRng`] so that the
//! same seed and sample count always produce the same partitions.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::prelude::*;
use thiserror::Error;

/// Errors from split construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("cannot split an empty dataset")]
    EmptyDataset,

    #[error("test_fraction must be in (0, 1), got {0}")]
    InvalidTestFraction(String),

    #[error("test fraction leaves an empty {0} partition for {1} samples")]
    DegeneratePartition(&'static str, usize),

    #[error("n_folds must be at least 2, got {0}")]
    TooFewFolds(usize),

    #[error("n_folds ({n_folds}) exceeds sample count ({n_samples})")]
    TooManySamplesRequired { n_folds: usize, n_samples: usize },
}

// =============================================================================
// Train/Test Split
// =============================================================================

/// Index partition produced by [`train_test_split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_samples` with the given seed and split off the last
/// `test_fraction` as the test partition.
///
/// Deterministic: the same `(n_samples, test_fraction, seed)` always
/// yields identical partitions.
///
/// # Errors
///
/// Returns an error for an empty dataset, a fraction outside `(0, 1)`,
/// or a fraction that leaves either partition empty.
pub fn train_test_split(
    n_samples: usize,
    test_fraction: f32,
    seed: u64,
) -> Result<TrainTestSplit, SplitError> {
    if n_samples == 0 {
        return Err(SplitError::EmptyDataset);
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidTestFraction(format!("{test_fraction}")));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_samples as f64) * (test_fraction as f64)).round() as usize;
    if n_test == 0 {
        return Err(SplitError::DegeneratePartition("test", n_samples));
    }
    if n_test >= n_samples {
        return Err(SplitError::DegeneratePartition("train", n_samples));
    }

    let (train, test) = indices.split_at(n_samples - n_test);
    Ok(TrainTestSplit {
        train: train.to_vec(),
        test: test.to_vec(),
    })
}

// =============================================================================
// K-Fold Plan
// =============================================================================

/// A fixed k-fold partition of sample indices.
///
/// Folds are planned once up front so that every grid-search candidate is
/// evaluated against identical partitions. Indices are shuffled with the
/// seed, then dealt into `k` contiguous chunks whose sizes differ by at
/// most one.
#[derive(Debug, Clone)]
pub struct KFoldPlan {
    folds: Vec<Vec<usize>>,
}

impl KFoldPlan {
    /// Plan `n_folds` folds over `n_samples` indices.
    ///
    /// # Errors
    ///
    /// Returns an error if `n_folds < 2` or `n_folds > n_samples`.
    pub fn new(n_samples: usize, n_folds: usize, seed: u64) -> Result<Self, SplitError> {
        if n_folds < 2 {
            return Err(SplitError::TooFewFolds(n_folds));
        }
        if n_folds > n_samples {
            return Err(SplitError::TooManySamplesRequired { n_folds, n_samples });
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let base = n_samples / n_folds;
        let remainder = n_samples % n_folds;

        let mut folds = Vec::with_capacity(n_folds);
        let mut cursor = 0;
        for fold in 0..n_folds {
            let len = base + usize::from(fold < remainder);
            folds.push(indices[cursor..cursor + len].to_vec());
            cursor += len;
        }

        Ok(Self { folds })
    }

    /// Number of folds.
    pub fn n_folds(&self) -> usize {
        self.folds.len()
    }

    /// Held-out indices for fold `fold`.
    pub fn validation_indices(&self, fold: usize) -> &[usize] {
        &self.folds[fold]
    }

    /// Training indices for fold `fold` (all other folds concatenated).
    pub fn training_indices(&self, fold: usize) -> Vec<usize> {
        let mut train = Vec::new();
        for (i, f) in self.folds.iter().enumerate() {
            if i != fold {
                train.extend_from_slice(f);
            }
        }
        train
    }
}

// =============================================================================
// Row Selection
// =============================================================================

/// Gather the given rows of a sample-major matrix.
pub fn take_rows(matrix: ArrayView2<f32>, indices: &[usize]) -> Array2<f32> {
    matrix.select(Axis(0), indices)
}

/// Gather the given entries of a vector.
pub fn take_values(values: ArrayView1<f32>, indices: &[usize]) -> Array1<f32> {
    values.select(Axis(0), indices)
}

// =============================================================================
// Tests
// =============================================================================
