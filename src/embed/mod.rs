//! Embedding encoders and their checkpoint format.

mod checkpoint;
mod encoder;

pub use checkpoint::{
    load_encoder, save_encoder, CheckpointError, CheckpointPayload, CheckpointV1, LayerPayload,
    CHECKPOINT_MAGIC,
};
pub use encoder::{DenseLayer, EncoderKind, EncoderShapeError, ImageEncoder, PoolEncoder};
