//! geoforest: feature extraction + tuned random-forest regression.
//!
//! A one-shot offline fitting pipeline. Two pretrained image-embedding
//! encoders load from checkpoints; the geography-aware encoder turns a
//! validation image set into a feature matrix; an exhaustive
//! cross-validated grid search tunes a random-forest regressor on those
//! features; the best estimator is scored on a held-out split and
//! persisted to disk.
//!
//! # Key Types
//!
//! - [`PipelineConfig`] / [`pipeline::run`] - The end-to-end batch job
//! - [`PoolEncoder`] / [`ImageEncoder`] - Embedding encoders
//! - [`RandomForestRegressor`] / [`RandomForestConfig`] - The estimator
//! - [`ParamGrid`] / [`GridSearch`] - Hyperparameter search
//! - [`Manifest`] / [`BatchLoader`] - Data handling
//!
//! # Fitting
//!
//! Build a [`PipelineConfig`] (all paths are injectable) and call
//! [`pipeline::run`]. See the [`pipeline`] module for details.
//!
//! # Artifacts
//!
//! Fitted models and encoder checkpoints share a checksummed container
//! format; see the [`io`] and [`embed`] modules.

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod data;
pub mod embed;
pub mod forest;
pub mod io;
pub mod pipeline;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Pipeline entry points
pub use pipeline::{PipelineConfig, PipelineError, PipelineReport, RowAlignPolicy};

// Encoders
pub use embed::{ImageEncoder, PoolEncoder};

// Estimator types
pub use forest::{RandomForestConfig, RandomForestRegressor};

// Search types
pub use training::{GridSearch, GridSearchResult, MetricFn, Mse, ParamGrid, RSquared};

// Data types
pub use data::{BatchLoader, ImageTransform, Manifest};

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
