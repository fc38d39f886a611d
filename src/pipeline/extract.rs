//! Feature extraction and row alignment.
//!
//! One full pass over the batch iterator, accumulating per-batch
//! embeddings and labels, stacked along the sample axis. Extraction is
//! inference-only: encoders hold no mutable state and no batch result
//! feeds back into another.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use thiserror::Error;

use crate::data::{Batch, LoadError};
use crate::embed::ImageEncoder;

/// Errors from extraction and alignment.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("feature rows ({features}) do not match label rows ({labels}); \
             rerun with truncate alignment to keep the common prefix")]
    RowMismatch { features: usize, labels: usize },

    #[error("target column {column} is out of range for {width} label column(s)")]
    TargetColumnOutOfRange { column: usize, width: usize },
}

/// What to do when feature and label row counts disagree.
///
/// `Strict` is the pipeline default: a mismatch means an upstream bug
/// and fails fast. `Truncate` reproduces the legacy behavior of keeping
/// the common prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowAlignPolicy {
    #[default]
    Strict,
    Truncate,
}

/// Extracted feature/label matrices, stacked in batch order.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// `[n_samples, embedding_dim]`
    pub features: Array2<f32>,
    /// `[n_samples, label_width]`
    pub labels: Array2<f32>,
}

/// Run the encoder over every batch exactly once and stack the results.
///
/// `label_width` sizes the label matrix when the iterator is empty; zero
/// batches yield `[0, embedding_dim]` features and `[0, label_width]`
/// labels.
///
/// # Errors
///
/// The first batch error aborts extraction; partial results are
/// discarded.
pub fn extract_features<E, I>(
    encoder: &E,
    batches: I,
    label_width: usize,
) -> Result<Extracted, ExtractError>
where
    E: ImageEncoder,
    I: IntoIterator<Item = Result<Batch, LoadError>>,
{
    let dim = encoder.embedding_dim();
    let mut features: Vec<f32> = Vec::new();
    let mut labels: Vec<f32> = Vec::new();
    let mut rows = 0usize;

    for batch in batches {
        let batch = batch?;
        let embedded = encoder.embed_batch(batch.images.view());
        debug_assert_eq!(embedded.ncols(), dim);
        debug_assert_eq!(embedded.nrows(), batch.len());

        rows += embedded.nrows();
        features.extend(embedded.iter().copied());
        labels.extend(batch.labels.iter().copied());
    }

    let features = Array2::from_shape_vec((rows, dim), features)
        .expect("embedding width is fixed by the encoder");
    let label_rows = if rows == 0 {
        0
    } else {
        labels.len() / label_width.max(1)
    };
    let labels = Array2::from_shape_vec((label_rows, label_width), labels)
        .expect("label width is fixed by the manifest");

    Ok(Extracted { features, labels })
}

/// Reconcile feature and label row counts under the given policy.
///
/// With `Truncate`, both matrices keep their first `min(rows)` rows in
/// original order. With `Strict`, any mismatch is an error.
pub fn align_rows(
    features: Array2<f32>,
    labels: Array2<f32>,
    policy: RowAlignPolicy,
) -> Result<(Array2<f32>, Array2<f32>), ExtractError> {
    let feature_rows = features.nrows();
    let label_rows = labels.nrows();

    if feature_rows == label_rows {
        return Ok((features, labels));
    }

    match policy {
        RowAlignPolicy::Strict => Err(ExtractError::RowMismatch {
            features: feature_rows,
            labels: label_rows,
        }),
        RowAlignPolicy::Truncate => {
            let keep = feature_rows.min(label_rows);
            let features = features.slice_move(ndarray::s![..keep, ..]);
            let labels = labels.slice_move(ndarray::s![..keep, ..]);
            Ok((features, labels))
        }
    }
}

/// Reduce a label matrix to a single target column.
pub fn target_column(labels: ArrayView2<f32>, column: usize) -> Result<Array1<f32>, ExtractError> {
    if column >= labels.ncols() {
        return Err(ExtractError::TargetColumnOutOfRange {
            column,
            width: labels.ncols(),
        });
    }
    Ok(labels.index_axis(Axis(1), column).to_owned())
}

// =============================================================================
// Tests
// =============================================================================
