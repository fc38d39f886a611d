//! The batch fitting pipeline.
//!
//! A straight-line job: load encoders → extract features → align and
//! reduce labels → split → grid search → evaluate → persist. There is no
//! retry or partial recovery; the first error aborts the run.

mod config;
mod extract;

pub use config::{PipelineConfig, PipelineConfigError};
pub use extract::{
    align_rows, extract_features, target_column, ExtractError, Extracted, RowAlignPolicy,
};

use std::path::PathBuf;

use thiserror::Error;

use crate::data::{BatchLoader, ImageTransform, Manifest, ManifestError};
use crate::embed::{load_encoder, CheckpointError, EncoderKind, ImageEncoder};
use crate::forest::RandomForestConfig;
use crate::io::{save_model, SerializeError};
use crate::training::{
    take_rows, take_values, train_test_split, GridSearch, MetricFn, Mse, RSquared, SearchError,
    SearchLogger, SplitError,
};
use crate::utils::{run_with_threads, Parallelism};

/// Errors from a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load {kind} encoder: {source}")]
    Checkpoint {
        kind: &'static str,
        source: CheckpointError,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("no samples to fit on (manifest was empty)")]
    EmptySampleSet,

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("failed to persist model: {0}")]
    Persist(#[from] SerializeError),
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Samples extracted (after alignment).
    pub n_samples: usize,
    /// Embedding dimensionality of the feature matrix.
    pub embedding_dim: usize,
    /// Winning hyperparameters.
    pub best_params: RandomForestConfig,
    /// Mean cross-validated R² of the winner.
    pub cv_r2: f64,
    /// Mean squared error on the held-out test split.
    pub test_mse: f64,
    /// R² on the held-out test split.
    pub test_r2: f64,
    /// Where the fitted model was written.
    pub model_path: PathBuf,
}

/// Run the full fitting pipeline.
///
/// Sets up the rayon pool from `config.n_threads` and executes the batch
/// job inside it. Returns a [`PipelineReport`] on success; any failure
/// aborts the run with a [`PipelineError`].
pub fn run(config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    run_with_threads(config.n_threads, |parallelism| {
        run_inner(config, parallelism)
    })
}

fn run_inner(
    config: &PipelineConfig,
    parallelism: Parallelism,
) -> Result<PipelineReport, PipelineError> {
    let logger = SearchLogger::new(config.verbosity);

    // --- Load encoders -----------------------------------------------------
    // Both pretrained encoders must load; features come from the
    // geography-aware one.
    let contrastive =
        load_encoder(&config.contrastive_checkpoint).map_err(|source| PipelineError::Checkpoint {
            kind: "contrastive",
            source,
        })?;
    let geo = load_encoder(&config.geo_checkpoint).map_err(|source| PipelineError::Checkpoint {
        kind: "geography-aware",
        source,
    })?;
    logger.info(format_args!(
        "[load] {} encoder dim={} | {} encoder dim={}",
        EncoderKind::Contrastive,
        contrastive.embedding_dim(),
        EncoderKind::GeographyAware,
        geo.embedding_dim()
    ));

    // --- Extract ------------------------------------------------------------
    let manifest = Manifest::read(&config.manifest, &config.image_root)?;
    let transform = ImageTransform::with_size(geo.input_size());
    let loader = BatchLoader::new(&manifest, transform, config.batch_size, parallelism);
    let label_width = loader.label_width();

    let extracted = extract_features(&geo, loader, label_width)?;
    logger.info(format_args!(
        "[extract] features {:?} labels {:?}",
        extracted.features.dim(),
        extracted.labels.dim()
    ));

    let (features, labels) = align_rows(extracted.features, extracted.labels, config.align)?;
    let target = target_column(labels.view(), config.target_column)?;
    logger.info(format_args!(
        "[align] features {:?} target len={}",
        features.dim(),
        target.len()
    ));

    let n_samples = features.nrows();
    if n_samples == 0 {
        return Err(PipelineError::EmptySampleSet);
    }
    let embedding_dim = features.ncols();

    // --- Split --------------------------------------------------------------
    let split = train_test_split(n_samples, config.test_fraction, config.seed)?;
    let train_x = take_rows(features.view(), &split.train);
    let train_y = take_values(target.view(), &split.train);
    let test_x = take_rows(features.view(), &split.test);
    let test_y = take_values(target.view(), &split.test);

    // --- Grid search --------------------------------------------------------
    let search = GridSearch::new(config.grid.clone())
        .with_folds(config.n_folds)
        .with_seed(config.seed);
    let result = search.run(
        train_x.view(),
        train_y.view(),
        &RSquared,
        parallelism,
        &logger,
    )?;

    // --- Evaluate -----------------------------------------------------------
    let predictions = result
        .best_model
        .predict(test_x.view())
        .map_err(SearchError::from)?;
    let test_mse = Mse.compute(predictions.view(), test_y.view());
    let test_r2 = RSquared.compute(predictions.view(), test_y.view());

    // --- Persist ------------------------------------------------------------
    let best_params = result.best_config().clone();
    let attributes = vec![
        ("best_params".to_string(), best_params.to_string()),
        ("cv_r2".to_string(), format!("{:.6}", result.best_score)),
        ("test_mse".to_string(), format!("{test_mse:.6}")),
        ("test_r2".to_string(), format!("{test_r2:.6}")),
        ("seed".to_string(), config.seed.to_string()),
    ];
    save_model(&config.output_model, &result.best_model, attributes)?;

    logger.info(format_args!("[fit] best parameters: {best_params}"));
    logger.info(format_args!("[eval] mse={test_mse:.6} r2={test_r2:.6}"));
    logger.info(format_args!(
        "[save] model written to {}",
        config.output_model.display()
    ));

    Ok(PipelineReport {
        n_samples,
        embedding_dim,
        best_params,
        cv_r2: result.best_score,
        test_mse,
        test_r2,
        model_path: config.output_model.clone(),
    })
}
