//! Regression metrics.
//!
//! Metrics for scoring a fitted regressor against held-out targets.
//! All metrics operate on single-output predictions.

use ndarray::ArrayView1;

// =============================================================================
// MetricFn
// =============================================================================

/// A scoring function over predictions and targets.
///
/// Implementations must return a finite value for non-empty, finite inputs.
pub trait MetricFn {
    /// Compute the metric over parallel prediction/target slices.
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f64;

    /// Whether higher values are better (true for R², false for MSE).
    fn higher_is_better(&self) -> bool;

    /// Short metric name, used in log lines.
    fn name(&self) -> &'static str;
}

// =============================================================================
// MSE (Mean Squared Error)
// =============================================================================

/// Mean Squared Error: mean((pred - target)²)
///
/// Lower is better. Used for regression tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mse;

impl MetricFn for Mse {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f64 {
        debug_assert_eq!(predictions.len(), targets.len());
        let n = predictions.len();
        if n == 0 {
            return 0.0;
        }

        let sum_sq = predictions
            .iter()
            .zip(targets.iter())
            .fold(0.0f64, |acc, (&p, &t)| {
                let diff = p as f64 - t as f64;
                acc + diff * diff
            });

        sum_sq / n as f64
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "mse"
    }
}

// =============================================================================
// R² (Coefficient of Determination)
// =============================================================================

/// Coefficient of determination: 1 - SS_res / SS_tot.
///
/// Higher is better; 1.0 is a perfect fit, 0.0 matches predicting the
/// target mean, negative values are worse than the mean predictor.
///
/// When the targets are constant (SS_tot = 0) the score is defined as
/// 0.0 so that cross-validated scores stay finite.
#[derive(Debug, Clone, Copy, Default)]
pub struct RSquared;

impl MetricFn for RSquared {
    fn compute(&self, predictions: ArrayView1<f32>, targets: ArrayView1<f32>) -> f64 {
        debug_assert_eq!(predictions.len(), targets.len());
        let n = predictions.len();
        if n == 0 {
            return 0.0;
        }

        let mean = targets.iter().map(|&t| t as f64).sum::<f64>() / n as f64;

        let (ss_res, ss_tot) = predictions
            .iter()
            .zip(targets.iter())
            .fold((0.0f64, 0.0f64), |(res, tot), (&p, &t)| {
                let t = t as f64;
                let r = p as f64 - t;
                let d = t - mean;
                (res + r * r, tot + d * d)
            });

        if ss_tot > 0.0 {
            1.0 - ss_res / ss_tot
        } else {
            0.0
        }
    }

    fn higher_is_better(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "r2"
    }
}

// =============================================================================
// Tests
// =============================================================================
