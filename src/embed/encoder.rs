//! Pretrained embedding encoders.
//!
//! Encoders are opaque collaborators to the rest of the pipeline: the
//! only capability the extractor relies on is "image batch in, embedding
//! batch out" ([`ImageEncoder`]). The concrete [`PoolEncoder`] pools the
//! normalized image into a fixed grid of per-channel cell means and runs
//! the result through a stack of dense ReLU layers; the contrastive
//! variant L2-normalizes its output embeddings.

use ndarray::{Array1, Array2, Array4, ArrayView4, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capability required by the feature extractor.
pub trait ImageEncoder {
    /// Output embedding width.
    fn embedding_dim(&self) -> usize;

    /// Map an image batch `[batch, 3, size, size]` to embeddings
    /// `[batch, embedding_dim]`.
    fn embed_batch(&self, images: ArrayView4<f32>) -> Array2<f32>;
}

/// Which pretraining produced an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderKind {
    /// Momentum-contrast pretraining; embeddings are L2-normalized.
    Contrastive,
    /// Geography-aware pretraining.
    GeographyAware,
}

impl std::fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contrastive => write!(f, "contrastive"),
            Self::GeographyAware => write!(f, "geography-aware"),
        }
    }
}

/// Structural validation errors for encoder construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncoderShapeError {
    #[error("encoder has no layers")]
    NoLayers,

    #[error("pool grid {grid} is invalid for input size {input}")]
    InvalidPoolGrid { grid: u32, input: u32 },

    #[error("layer {layer}: expected {expected} inputs, got {actual}")]
    LayerChainMismatch {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("layer {layer}: bias length {bias} does not match {outputs} outputs")]
    BiasMismatch {
        layer: usize,
        bias: usize,
        outputs: usize,
    },
}

// =============================================================================
// DenseLayer
// =============================================================================

/// One dense layer: `y = x · weights + bias`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// Weight matrix, shape `[n_in, n_out]`.
    pub weights: Array2<f32>,
    /// Bias vector, length `n_out`.
    pub bias: Array1<f32>,
}

impl DenseLayer {
    pub fn n_in(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_out(&self) -> usize {
        self.weights.ncols()
    }
}

// =============================================================================
// PoolEncoder
// =============================================================================

/// Patch-pooling embedding network.
///
/// The front end averages each channel over a `pool_grid x pool_grid`
/// cell grid, flattening to `3 * pool_grid²` inputs; the dense stack maps
/// that to the embedding space. All layers except the last apply ReLU.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEncoder {
    kind: EncoderKind,
    input_size: u32,
    pool_grid: u32,
    layers: Vec<DenseLayer>,
    normalize: bool,
}

impl PoolEncoder {
    /// Assemble and validate an encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the layer stack is empty, the pool grid does
    /// not fit the input size, or consecutive layer shapes disagree.
    pub fn new(
        kind: EncoderKind,
        input_size: u32,
        pool_grid: u32,
        layers: Vec<DenseLayer>,
        normalize: bool,
    ) -> Result<Self, EncoderShapeError> {
        if layers.is_empty() {
            return Err(EncoderShapeError::NoLayers);
        }
        if pool_grid == 0 || pool_grid > input_size {
            return Err(EncoderShapeError::InvalidPoolGrid {
                grid: pool_grid,
                input: input_size,
            });
        }

        let mut expected_in = 3 * (pool_grid as usize) * (pool_grid as usize);
        for (idx, layer) in layers.iter().enumerate() {
            if layer.n_in() != expected_in {
                return Err(EncoderShapeError::LayerChainMismatch {
                    layer: idx,
                    expected: expected_in,
                    actual: layer.n_in(),
                });
            }
            if layer.bias.len() != layer.n_out() {
                return Err(EncoderShapeError::BiasMismatch {
                    layer: idx,
                    bias: layer.bias.len(),
                    outputs: layer.n_out(),
                });
            }
            expected_in = layer.n_out();
        }

        Ok(Self {
            kind,
            input_size,
            pool_grid,
            layers,
            normalize,
        })
    }

    pub fn kind(&self) -> EncoderKind {
        self.kind
    }

    /// Edge length of the images this encoder expects.
    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    pub fn pool_grid(&self) -> u32 {
        self.pool_grid
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub(crate) fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Average each channel over the pool grid: `[b, 3, s, s]` →
    /// `[b, 3 * g * g]`.
    fn pool(&self, images: ArrayView4<f32>) -> Array2<f32> {
        let (batch, channels, height, width) = images.dim();
        debug_assert_eq!(channels, 3);
        debug_assert_eq!(height, self.input_size as usize);
        debug_assert_eq!(width, self.input_size as usize);

        let g = self.pool_grid as usize;
        let mut pooled = Array2::<f32>::zeros((batch, 3 * g * g));

        for b in 0..batch {
            for c in 0..channels {
                for gy in 0..g {
                    let y0 = gy * height / g;
                    let y1 = ((gy + 1) * height / g).max(y0 + 1);
                    for gx in 0..g {
                        let x0 = gx * width / g;
                        let x1 = ((gx + 1) * width / g).max(x0 + 1);

                        let mut sum = 0.0f32;
                        for y in y0..y1 {
                            for x in x0..x1 {
                                sum += images[[b, c, y, x]];
                            }
                        }
                        let count = ((y1 - y0) * (x1 - x0)) as f32;
                        pooled[[b, (c * g + gy) * g + gx]] = sum / count;
                    }
                }
            }
        }

        pooled
    }
}

impl ImageEncoder for PoolEncoder {
    fn embedding_dim(&self) -> usize {
        self.layers.last().map(DenseLayer::n_out).unwrap_or(0)
    }

    fn embed_batch(&self, images: ArrayView4<f32>) -> Array2<f32> {
        let mut activations = self.pool(images);

        let last = self.layers.len() - 1;
        for (idx, layer) in self.layers.iter().enumerate() {
            let mut out = activations.dot(&layer.weights);
            out += &layer.bias;
            if idx < last {
                out.mapv_inplace(|v| v.max(0.0));
            }
            activations = out;
        }

        if self.normalize {
            for mut row in activations.axis_iter_mut(Axis(0)) {
                let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > f32::EPSILON {
                    row.mapv_inplace(|v| v / norm);
                }
            }
        }

        activations
    }
}

/// Convenience: embed an owned batch (used by tests).
impl PoolEncoder {
    pub fn embed(&self, images: &Array4<f32>) -> Array2<f32> {
        self.embed_batch(images.view())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2, Array4};

    fn identity_layer(n: usize) -> DenseLayer {
        DenseLayer {
            weights: Array2::eye(n),
            bias: Array1::zeros(n),
        }
    }

    fn tiny_encoder(kind: EncoderKind, normalize: bool) -> PoolEncoder {
        // 4x4 input, 2x2 grid → 12 pooled values, identity dense layer.
        PoolEncoder::new(kind, 4, 2, vec![identity_layer(12)], normalize).unwrap()
    }

    #[test]
    fn rejects_empty_layer_stack() {
        let err = PoolEncoder::new(EncoderKind::GeographyAware, 4, 2, vec![], false).unwrap_err();
        assert_eq!(err, EncoderShapeError::NoLayers);
    }

    #[test]
    fn rejects_mismatched_layer_chain() {
        let err = PoolEncoder::new(
            EncoderKind::GeographyAware,
            4,
            2,
            vec![identity_layer(7)],
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EncoderShapeError::LayerChainMismatch {
                layer: 0,
                expected: 12,
                actual: 7
            }
        );
    }

    #[test]
    fn rejects_oversized_pool_grid() {
        let err = PoolEncoder::new(
            EncoderKind::Contrastive,
            4,
            8,
            vec![identity_layer(192)],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, EncoderShapeError::InvalidPoolGrid { .. }));
    }

    #[test]
    fn pooling_averages_grid_cells() {
        let encoder = tiny_encoder(EncoderKind::GeographyAware, false);
        // Channel 0 holds the pixel's y coordinate; others zero.
        let images = Array4::from_shape_fn((1, 3, 4, 4), |(_, c, y, _)| {
            if c == 0 {
                y as f32
            } else {
                0.0
            }
        });
        let out = encoder.embed(&images);
        assert_eq!(out.dim(), (1, 12));
        // Top cells average rows {0,1} → 0.5; bottom cells rows {2,3} → 2.5.
        assert_abs_diff_eq!(out[[0, 0]], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[0, 1]], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[0, 2]], 2.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[0, 3]], 2.5, epsilon = 1e-6);
    }

    #[test]
    fn normalized_embeddings_have_unit_norm() {
        let encoder = tiny_encoder(EncoderKind::Contrastive, true);
        let images = Array4::from_shape_fn((2, 3, 4, 4), |(b, c, y, x)| {
            (b + c + y + x) as f32 + 1.0
        });
        let out = encoder.embed(&images);
        for row in out.rows() {
            let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn relu_applies_between_layers_only() {
        // Two layers: first maps everything negative, second is identity.
        // ReLU after layer 0 zeroes the activations, so output = bias of
        // layer 1 regardless of input.
        let l0 = DenseLayer {
            weights: Array2::from_elem((12, 4), -1.0),
            bias: Array1::zeros(4),
        };
        let l1 = DenseLayer {
            weights: Array2::eye(4),
            bias: Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0]),
        };
        let encoder =
            PoolEncoder::new(EncoderKind::GeographyAware, 4, 2, vec![l0, l1], false).unwrap();

        let images = Array4::from_elem((1, 3, 4, 4), 0.7);
        let out = encoder.embed(&images);
        assert_eq!(out.dim(), (1, 4));
        for (i, &v) in out.row(0).iter().enumerate() {
            assert_abs_diff_eq!(v, (i + 1) as f32, epsilon = 1e-6);
        }
    }

    #[test]
    fn embedding_dim_is_last_layer_width() {
        let encoder = tiny_encoder(EncoderKind::GeographyAware, false);
        assert_eq!(encoder.embedding_dim(), 12);
    }
}
