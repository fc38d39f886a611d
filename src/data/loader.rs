//! Sequential batch loader over a manifest.
//!
//! Batches are consumed strictly in manifest order (no shuffling: the
//! pipeline extracts features for a fixed validation set). Within a
//! batch, image decode + preprocessing fans out over the rayon pool.

use std::path::PathBuf;

use ndarray::{Array2, Array4};
use thiserror::Error;

use crate::utils::Parallelism;

use super::manifest::Manifest;
use super::transform::ImageTransform;

/// Errors from batch assembly.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// One collated batch: images `[batch, 3, size, size]` and labels
/// `[batch, label_width]`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: Array4<f32>,
    pub labels: Array2<f32>,
}

impl Batch {
    /// Samples in this batch.
    pub fn len(&self) -> usize {
        self.images.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Iterator yielding fixed-size batches from a manifest.
///
/// The final batch is smaller when the sample count is not a multiple of
/// the batch size. Decode failures surface as the iterator item; the
/// caller decides whether to abort (the pipeline always does).
pub struct BatchLoader<'a> {
    manifest: &'a Manifest,
    transform: ImageTransform,
    batch_size: usize,
    parallelism: Parallelism,
    cursor: usize,
}

impl<'a> BatchLoader<'a> {
    pub fn new(
        manifest: &'a Manifest,
        transform: ImageTransform,
        batch_size: usize,
        parallelism: Parallelism,
    ) -> Self {
        debug_assert!(batch_size > 0);
        Self {
            manifest,
            transform,
            batch_size,
            parallelism,
            cursor: 0,
        }
    }

    /// Number of label columns each batch carries.
    pub fn label_width(&self) -> usize {
        self.manifest.label_width()
    }

    /// Batches remaining from the current position.
    pub fn remaining_batches(&self) -> usize {
        let remaining = self.manifest.len() - self.cursor;
        remaining.div_ceil(self.batch_size)
    }
}

impl Iterator for BatchLoader<'_> {
    type Item = Result<Batch, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.manifest.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.manifest.len());
        let entries = &self.manifest.entries()[self.cursor..end];
        self.cursor = end;

        let transform = self.transform;
        let decoded = self.parallelism.maybe_par_map(entries, |entry| {
            image::open(&entry.image)
                .map(|img| transform.apply(&img))
                .map_err(|source| LoadError::Image {
                    path: entry.image.clone(),
                    source,
                })
        });

        let size = self.transform.size as usize;
        let n = entries.len();
        let mut pixels = Vec::with_capacity(n * 3 * size * size);
        for result in decoded {
            match result {
                Ok(chw) => pixels.extend(chw.into_iter()),
                Err(err) => return Some(Err(err)),
            }
        }
        let images = Array4::from_shape_vec((n, 3, size, size), pixels)
            .expect("decoded pixel count matches batch shape");

        let width = self.manifest.label_width();
        let mut labels = Vec::with_capacity(n * width);
        for entry in entries {
            labels.extend_from_slice(&entry.labels);
        }
        let labels = Array2::from_shape_vec((n, width), labels)
            .expect("label count matches manifest width");

        Some(Ok(Batch { images, labels }))
    }
}

// =============================================================================
// Tests
// =============================================================================
