//! Random-forest configuration with builder pattern.
//!
//! [`RandomForestConfig`] mirrors the hyperparameters tuned by the grid
//! search. The builder (via `bon`) validates at build time; invalid
//! combinations never reach the trainer.
//!
//! # Example
//!
//! ```
//! use geoforest::forest::RandomForestConfig;
//!
//! // All defaults
//! let config = RandomForestConfig::builder().build().unwrap();
//!
//! // Tuned combination
//! let config = RandomForestConfig::builder()
//!     .n_trees(200)
//!     .max_depth(20)
//!     .min_samples_split(5)
//!     .min_samples_leaf(2)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Number of trees must be at least 1.
    InvalidNTrees,
    /// Maximum depth must be at least 1.
    InvalidMaxDepth,
    /// A minimum-samples parameter is out of range.
    InvalidMinSamples { field: &'static str, value: usize },
    /// max_features must be at least 1 when set.
    InvalidMaxFeatures,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNTrees => write!(f, "n_trees must be at least 1"),
            Self::InvalidMaxDepth => write!(f, "max_depth must be at least 1"),
            Self::InvalidMinSamples { field, value } => {
                write!(f, "{} is out of range, got {}", field, value)
            }
            Self::InvalidMaxFeatures => write!(f, "max_features must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

// =============================================================================
// RandomForestConfig
// =============================================================================

/// Hyperparameters for random-forest training.
///
/// Defaults match the untuned baseline: 100 trees, depth 10, split at 2
/// samples, single-sample leaves, all features considered at each split.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct RandomForestConfig {
    /// Number of trees in the ensemble. Default: 100.
    #[builder(default = 100)]
    pub n_trees: usize,

    /// Maximum tree depth. Default: 10.
    #[builder(default = 10)]
    pub max_depth: usize,

    /// Minimum samples required to split an internal node. Default: 2.
    #[builder(default = 2)]
    pub min_samples_split: usize,

    /// Minimum samples required in each leaf. Default: 1.
    #[builder(default = 1)]
    pub min_samples_leaf: usize,

    /// Number of features considered per split. `None` = all features.
    pub max_features: Option<usize>,

    /// Random seed for bootstrap and feature sampling. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,
}

/// Custom finishing function that validates the config.
impl<S: random_forest_config_builder::IsComplete> RandomForestConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - `n_trees == 0` or `max_depth == 0`
    /// - `min_samples_split < 2` or `min_samples_leaf == 0`
    /// - `max_features == Some(0)`
    pub fn build(self) -> Result<RandomForestConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl RandomForestConfig {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees == 0 {
            return Err(ConfigError::InvalidNTrees);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth);
        }
        if self.min_samples_split < 2 {
            return Err(ConfigError::InvalidMinSamples {
                field: "min_samples_split",
                value: self.min_samples_split,
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(ConfigError::InvalidMinSamples {
                field: "min_samples_leaf",
                value: self.min_samples_leaf,
            });
        }
        if self.max_features == Some(0) {
            return Err(ConfigError::InvalidMaxFeatures);
        }
        Ok(())
    }
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

impl std::fmt::Display for RandomForestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "n_trees={} max_depth={} min_samples_split={} min_samples_leaf={}",
            self.n_trees, self.max_depth, self.min_samples_split, self.min_samples_leaf
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RandomForestConfig::default();
        assert_eq!(config.n_trees, 100);
        assert_eq!(config.max_depth, 10);
        assert_eq!(config.min_samples_split, 2);
        assert_eq!(config.min_samples_leaf, 1);
        assert_eq!(config.max_features, None);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn builder_rejects_zero_trees() {
        let err = RandomForestConfig::builder().n_trees(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidNTrees);
    }

    #[test]
    fn builder_rejects_zero_depth() {
        let err = RandomForestConfig::builder().max_depth(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidMaxDepth);
    }

    #[test]
    fn builder_rejects_min_samples_split_below_two() {
        let err = RandomForestConfig::builder()
            .min_samples_split(1)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidMinSamples {
                field: "min_samples_split",
                value: 1
            }
        );
    }

    #[test]
    fn builder_rejects_zero_leaf() {
        let err = RandomForestConfig::builder()
            .min_samples_leaf(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMinSamples { .. }));
    }

    #[test]
    fn builder_rejects_zero_max_features() {
        let err = RandomForestConfig::builder()
            .max_features(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidMaxFeatures);
    }

    #[test]
    fn display_lists_tuned_parameters() {
        let config = RandomForestConfig::builder()
            .n_trees(200)
            .max_depth(20)
            .min_samples_split(5)
            .min_samples_leaf(2)
            .build()
            .unwrap();
        assert_eq!(
            config.to_string(),
            "n_trees=200 max_depth=20 min_samples_split=5 min_samples_leaf=2"
        );
    }
}
