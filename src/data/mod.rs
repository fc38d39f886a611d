//! Dataset handling: manifest parsing, image preprocessing, batching.

mod loader;
mod manifest;
mod transform;

pub use loader::{Batch, BatchLoader, LoadError};
pub use manifest::{Manifest, ManifestEntry, ManifestError};
pub use transform::{
    ImageTransform, DEFAULT_IMAGE_SIZE, DEFAULT_MEAN, DEFAULT_STD,
};
