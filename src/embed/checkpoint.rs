//! Encoder checkpoint format.
//!
//! Checkpoints use the same container discipline as the model artifact
//! (magic, version, CRC32, Postcard payload) with their own magic bytes.
//! The payload stores the pooling geometry and raw layer weights; shape
//! validation happens on load when the runtime encoder is rebuilt.

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::{read_container, write_container, DeserializeError, SerializeError};

use super::encoder::{DenseLayer, EncoderKind, EncoderShapeError, PoolEncoder};

/// Magic bytes of an encoder checkpoint.
pub const CHECKPOINT_MAGIC: [u8; 4] = *b"GFEC";

/// Errors from checkpoint loading.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error(transparent)]
    Container(#[from] DeserializeError),

    #[error("layer {layer}: {expected} weights declared, {actual} stored")]
    WeightCount {
        layer: usize,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Shape(#[from] EncoderShapeError),
}

// ============================================================================
// Payload
// ============================================================================

/// Version-tagged checkpoint payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CheckpointPayload {
    V1(CheckpointV1),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointV1 {
    pub kind: EncoderKind,
    pub input_size: u32,
    pub pool_grid: u32,
    pub normalize: bool,
    pub layers: Vec<LayerPayload>,
}

/// One dense layer as flat row-major weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPayload {
    pub n_in: u32,
    pub n_out: u32,
    /// Row-major `[n_in, n_out]`.
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

// ============================================================================
// Load / Save
// ============================================================================

/// Load and validate an encoder checkpoint.
pub fn load_encoder(path: &Path) -> Result<PoolEncoder, CheckpointError> {
    let payload: CheckpointPayload = read_container(path, CHECKPOINT_MAGIC, "encoder checkpoint")?;
    let CheckpointPayload::V1(v1) = payload;

    let mut layers = Vec::with_capacity(v1.layers.len());
    for (idx, layer) in v1.layers.into_iter().enumerate() {
        let n_in = layer.n_in as usize;
        let n_out = layer.n_out as usize;
        if layer.weights.len() != n_in * n_out {
            return Err(CheckpointError::WeightCount {
                layer: idx,
                expected: n_in * n_out,
                actual: layer.weights.len(),
            });
        }
        if layer.bias.len() != n_out {
            return Err(CheckpointError::Shape(EncoderShapeError::BiasMismatch {
                layer: idx,
                bias: layer.bias.len(),
                outputs: n_out,
            }));
        }
        layers.push(DenseLayer {
            weights: Array2::from_shape_vec((n_in, n_out), layer.weights)
                .expect("weight count verified above"),
            bias: Array1::from_vec(layer.bias),
        });
    }

    let encoder = PoolEncoder::new(v1.kind, v1.input_size, v1.pool_grid, layers, v1.normalize)?;
    Ok(encoder)
}

/// Persist an encoder as a checkpoint.
///
/// Training jobs produce checkpoints elsewhere; this writer exists for
/// fixtures and tooling, and keeps the format round-trippable.
pub fn save_encoder(path: &Path, encoder: &PoolEncoder) -> Result<(), SerializeError> {
    let payload = CheckpointPayload::V1(CheckpointV1 {
        kind: encoder.kind(),
        input_size: encoder.input_size(),
        pool_grid: encoder.pool_grid(),
        normalize: encoder.normalize(),
        layers: encoder
            .layers()
            .iter()
            .map(|layer| LayerPayload {
                n_in: layer.n_in() as u32,
                n_out: layer.n_out() as u32,
                weights: layer.weights.iter().copied().collect(),
                bias: layer.bias.to_vec(),
            })
            .collect(),
    });
    write_container(path, CHECKPOINT_MAGIC, &payload)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;
    use tempfile::TempDir;

    fn sample_encoder() -> PoolEncoder {
        let layer = DenseLayer {
            weights: Array2::from_shape_fn((12, 5), |(i, j)| (i as f32 - j as f32) * 0.1),
            bias: Array1::from_vec(vec![0.1, -0.2, 0.3, 0.0, 0.5]),
        };
        PoolEncoder::new(EncoderKind::GeographyAware, 4, 2, vec![layer], false).unwrap()
    }

    #[test]
    fn checkpoint_roundtrip_preserves_embeddings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("geo.ckpt");
        let encoder = sample_encoder();
        save_encoder(&path, &encoder).unwrap();

        let loaded = load_encoder(&path).unwrap();
        assert_eq!(loaded, encoder);

        let images = Array4::from_shape_fn((2, 3, 4, 4), |(b, c, y, x)| {
            (b * 31 + c * 7 + y * 3 + x) as f32 * 0.01
        });
        assert_eq!(loaded.embed(&images), encoder.embed(&images));
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bogus.ckpt");
        std::fs::write(&path, b"not a checkpoint at all....").unwrap();
        let err = load_encoder(&path).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::Container(DeserializeError::WrongMagic { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_encoder(Path::new("/nonexistent/enc.ckpt")).unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::Container(DeserializeError::Io(_))
        ));
    }
}
