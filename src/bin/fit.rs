//! Fit a tuned random-forest regressor on pretrained image embeddings.
//!
//! Loads two encoder checkpoints, extracts features for the manifest's
//! validation images with the geography-aware encoder, grid-searches a
//! random forest with cross-validation, evaluates on a held-out split,
//! and writes the fitted model artifact.
//!
//! ```bash
//! cargo run --release --bin fit -- \
//!     --contrastive-checkpoint output/moco_model.ckpt \
//!     --geo-checkpoint output/geography_aware_model.ckpt \
//!     --manifest output/valid_images.csv \
//!     --image-root output/images \
//!     --output-model output/optimized_rf_model.gfrf
//! ```

use clap::Parser;
use geoforest::pipeline::{self, PipelineConfig, RowAlignPolicy};
use geoforest::training::{ParamGrid, Verbosity};

#[derive(Parser, Debug)]
#[command(
    name = "fit",
    about = "Fit a cross-validated random-forest regressor on image embeddings"
)]
struct Args {
    /// Contrastive (momentum-encoder) checkpoint.
    #[arg(long)]
    contrastive_checkpoint: String,

    /// Geography-aware checkpoint (produces the features).
    #[arg(long)]
    geo_checkpoint: String,

    /// Manifest CSV: image path column + one or more label columns.
    #[arg(long)]
    manifest: String,

    /// Directory the manifest's image paths are relative to.
    #[arg(long)]
    image_root: String,

    /// Destination for the fitted model artifact.
    #[arg(long)]
    output_model: String,

    /// Images per extraction batch.
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Held-out test fraction.
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f32,

    /// Cross-validation folds.
    #[arg(long, default_value_t = 3)]
    folds: usize,

    /// Seed for splits, folds, and forest fitting.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Thread count: 0 = all cores, 1 = sequential.
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Label column used as the regression target.
    #[arg(long, default_value_t = 0)]
    target_column: usize,

    /// Truncate to the shorter of feature/label rows on mismatch
    /// instead of failing.
    #[arg(long)]
    allow_row_mismatch: bool,

    /// Print per-candidate cross-validation scores.
    #[arg(long)]
    verbose: bool,

    /// Suppress all progress output.
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let verbosity = if args.quiet {
        Verbosity::Silent
    } else if args.verbose {
        Verbosity::Debug
    } else {
        Verbosity::Info
    };
    let align = if args.allow_row_mismatch {
        RowAlignPolicy::Truncate
    } else {
        RowAlignPolicy::Strict
    };

    let config = PipelineConfig::builder()
        .contrastive_checkpoint(args.contrastive_checkpoint)
        .geo_checkpoint(args.geo_checkpoint)
        .manifest(args.manifest)
        .image_root(args.image_root)
        .output_model(args.output_model)
        .batch_size(args.batch_size)
        .test_fraction(args.test_fraction)
        .n_folds(args.folds)
        .seed(args.seed)
        .n_threads(args.threads)
        .target_column(args.target_column)
        .align(align)
        .grid(ParamGrid::default())
        .verbosity(verbosity)
        .build()?;

    let report = pipeline::run(&config)?;

    if !args.quiet {
        println!();
        println!("Samples:            {}", report.n_samples);
        println!("Embedding dim:      {}", report.embedding_dim);
        println!("Best parameters:    {}", report.best_params);
        println!("CV R²:              {:.6}", report.cv_r2);
        println!("Test MSE:           {:.6}", report.test_mse);
        println!("Test R²:            {:.6}", report.test_r2);
        println!("Model artifact:     {}", report.model_path.display());
    }

    Ok(())
}
