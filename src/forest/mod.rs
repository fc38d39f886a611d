//! Random-forest regression.
//!
//! - [`RandomForestConfig`]: hyperparameters with a validating builder
//! - [`RandomForestRegressor`]: bagged ensemble with train/predict
//! - [`DecisionTree`]: the underlying regression tree (SoA layout)

mod config;
mod model;
mod tree;

pub use config::{ConfigError, RandomForestConfig};
pub use model::{ForestError, RandomForestRegressor};
pub use tree::{DecisionTree, NodeId};
