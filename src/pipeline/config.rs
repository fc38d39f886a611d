//! Pipeline configuration.
//!
//! Every filesystem path is injectable: the fitting job takes its
//! checkpoint, manifest, image-root, and output locations from the
//! caller instead of baking in absolute paths.

use std::path::PathBuf;

use bon::Builder;

use crate::training::{ParamGrid, Verbosity};

use super::extract::RowAlignPolicy;

// =============================================================================
// PipelineConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineConfigError {
    /// Batch size must be at least 1.
    InvalidBatchSize,
    /// Test fraction must be in (0, 1).
    InvalidTestFraction(f32),
    /// Cross-validation needs at least 2 folds.
    InvalidFolds(usize),
}

impl std::fmt::Display for PipelineConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBatchSize => write!(f, "batch_size must be at least 1"),
            Self::InvalidTestFraction(v) => {
                write!(f, "test_fraction must be in (0, 1), got {}", v)
            }
            Self::InvalidFolds(v) => write!(f, "n_folds must be at least 2, got {}", v),
        }
    }
}

impl std::error::Error for PipelineConfigError {}

// =============================================================================
// PipelineConfig
// =============================================================================

/// Full configuration of one fitting run.
///
/// # Example
///
/// ```
/// use geoforest::pipeline::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .contrastive_checkpoint("output/moco_model.ckpt")
///     .geo_checkpoint("output/geography_aware_model.ckpt")
///     .manifest("output/valid_images.csv")
///     .image_root("output/images")
///     .output_model("output/optimized_rf_model.gfrf")
///     .build()
///     .unwrap();
/// assert_eq!(config.batch_size, 32);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal),
    on(PathBuf, into)
)]
pub struct PipelineConfig {
    // === Inputs ===
    /// Contrastive (momentum-encoder) checkpoint path.
    pub contrastive_checkpoint: PathBuf,

    /// Geography-aware checkpoint path; this encoder produces the
    /// features.
    pub geo_checkpoint: PathBuf,

    /// Manifest CSV listing validation images and labels.
    pub manifest: PathBuf,

    /// Directory the manifest's image paths are relative to.
    pub image_root: PathBuf,

    // === Output ===
    /// Destination for the fitted model artifact.
    pub output_model: PathBuf,

    // === Extraction ===
    /// Images per extraction batch. Default: 32.
    #[builder(default = 32)]
    pub batch_size: usize,

    /// Row-alignment policy when feature/label counts disagree.
    /// Default: strict (fail fast).
    #[builder(default)]
    pub align: RowAlignPolicy,

    /// Which label column is the regression target. Default: 0.
    #[builder(default = 0)]
    pub target_column: usize,

    // === Search ===
    /// Hyperparameter grid. Default: the full 81-combination sweep.
    #[builder(default)]
    pub grid: ParamGrid,

    /// Cross-validation folds. Default: 3.
    #[builder(default = 3)]
    pub n_folds: usize,

    /// Held-out test fraction. Default: 0.2.
    #[builder(default = 0.2)]
    pub test_fraction: f32,

    // === Reproducibility ===
    /// Seed for splits, folds, and forest fitting. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    // === Resources ===
    /// Thread count: 0 = all cores, 1 = sequential. Default: 0.
    #[builder(default = 0)]
    pub n_threads: usize,

    // === Logging ===
    /// Progress verbosity. Default: `Info`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

/// Custom finishing function that validates the config.
impl<S: pipeline_config_builder::IsComplete> PipelineConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineConfigError`] for a zero batch size, a test
    /// fraction outside (0, 1), or fewer than 2 folds.
    pub fn build(self) -> Result<PipelineConfig, PipelineConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), PipelineConfigError> {
        if self.batch_size == 0 {
            return Err(PipelineConfigError::InvalidBatchSize);
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineConfigError::InvalidTestFraction(self.test_fraction));
        }
        if self.n_folds < 2 {
            return Err(PipelineConfigError::InvalidFolds(self.n_folds));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
