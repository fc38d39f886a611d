//! Training infrastructure: splitting, metrics, grid search, logging.
//!
//! - [`train_test_split`], [`KFoldPlan`]: seeded partitions
//! - [`MetricFn`], [`Mse`], [`RSquared`]: scoring
//! - [`ParamGrid`], [`GridSearch`]: exhaustive cross-validated search
//! - [`SearchLogger`], [`Verbosity`]: structured stdout progress

mod logger;
mod metrics;
mod search;
mod split;

pub use logger::{SearchLogger, Verbosity};
pub use metrics::{MetricFn, Mse, RSquared};
pub use search::{CandidateScore, GridSearch, GridSearchResult, ParamGrid, SearchError};
pub use split::{
    take_rows, take_values, train_test_split, KFoldPlan, SplitError, TrainTestSplit,
};
