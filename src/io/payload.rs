//! Payload structures for the native artifact format.
//!
//! These structs are specifically designed for serialization with
//! Postcard. They mirror the runtime types but are optimized for compact
//! binary storage.

use serde::{Deserialize, Serialize};

use crate::forest::{ConfigError, RandomForestConfig, RandomForestRegressor};

// ============================================================================
// Top-Level Payload
// ============================================================================

/// Version-tagged payload enum for forward compatibility.
///
/// New format versions add new variants rather than modifying existing
/// ones. Older readers detect unsupported versions by the enum
/// discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    /// Version 1 payload format.
    V1(PayloadV1),
}

/// Version 1 payload structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadV1 {
    /// Model metadata.
    pub metadata: ModelMetadata,
    /// The fitted forest.
    pub forest: ForestPayload,
}

// ============================================================================
// Metadata
// ============================================================================

/// Metadata stored alongside the fitted model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Number of input features (embedding dimensionality).
    pub n_features: u32,
    /// Additional key-value attributes (search provenance, scores).
    pub attributes: Vec<(String, String)>,
}

impl ModelMetadata {
    /// Look up an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

// ============================================================================
// Forest Payload
// ============================================================================

/// Fitted forest: hyperparameters plus per-tree node arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestPayload {
    pub config: ForestConfigPayload,
    pub trees: Vec<TreePayload>,
}

/// Hyperparameters the forest was fit with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfigPayload {
    pub n_trees: u32,
    pub max_depth: u32,
    pub min_samples_split: u32,
    pub min_samples_leaf: u32,
    /// 0 = all features.
    pub max_features: u32,
    pub seed: u64,
}

/// Single decision tree in SoA form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreePayload {
    /// Split feature indices (one per node, 0 for leaves).
    pub split_features: Vec<u32>,
    /// Split thresholds (one per node, 0.0 for leaves).
    pub thresholds: Vec<f32>,
    /// Left child indices (one per node, 0 for leaves).
    pub left_children: Vec<u32>,
    /// Right child indices (one per node, 0 for leaves).
    pub right_children: Vec<u32>,
    /// Whether each node is a leaf.
    pub is_leaf: Vec<bool>,
    /// Leaf values (one per node, 0.0 for internal nodes).
    pub leaf_values: Vec<f32>,
}

// ============================================================================
// Runtime <-> Payload Conversion
// ============================================================================

impl ForestPayload {
    /// Capture a fitted forest.
    pub fn from_model(model: &RandomForestRegressor) -> Self {
        let config = model.config();
        Self {
            config: ForestConfigPayload {
                n_trees: config.n_trees as u32,
                max_depth: config.max_depth as u32,
                min_samples_split: config.min_samples_split as u32,
                min_samples_leaf: config.min_samples_leaf as u32,
                max_features: config.max_features.unwrap_or(0) as u32,
                seed: config.seed,
            },
            trees: model
                .trees()
                .iter()
                .map(|tree| TreePayload {
                    split_features: tree.split_features.clone(),
                    thresholds: tree.thresholds.clone(),
                    left_children: tree.left_children.clone(),
                    right_children: tree.right_children.clone(),
                    is_leaf: tree.is_leaf.clone(),
                    leaf_values: tree.leaf_values.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild the runtime forest.
    pub fn into_model(self, n_features: usize) -> Result<RandomForestRegressor, ConfigError> {
        let cfg = &self.config;
        let max_features = (cfg.max_features > 0).then_some(cfg.max_features as usize);
        let config: RandomForestConfig = RandomForestConfig::builder()
            .n_trees(cfg.n_trees as usize)
            .max_depth(cfg.max_depth as usize)
            .min_samples_split(cfg.min_samples_split as usize)
            .min_samples_leaf(cfg.min_samples_leaf as usize)
            .maybe_max_features(max_features)
            .seed(cfg.seed)
            .build()?;

        let trees = self
            .trees
            .into_iter()
            .map(|t| {
                crate::forest::DecisionTree::from_arrays(
                    t.split_features,
                    t.thresholds,
                    t.left_children,
                    t.right_children,
                    t.is_leaf,
                    t.leaf_values,
                )
            })
            .collect();

        Ok(RandomForestRegressor::from_parts(trees, config, n_features))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_roundtrips_through_postcard() {
        let payload = Payload::V1(PayloadV1 {
            metadata: ModelMetadata {
                n_features: 8,
                attributes: vec![("cv_r2".into(), "0.91".into())],
            },
            forest: ForestPayload {
                config: ForestConfigPayload {
                    n_trees: 1,
                    max_depth: 2,
                    min_samples_split: 2,
                    min_samples_leaf: 1,
                    max_features: 0,
                    seed: 42,
                },
                trees: vec![TreePayload {
                    split_features: vec![0, 0, 0],
                    thresholds: vec![0.5, 0.0, 0.0],
                    left_children: vec![1, 0, 0],
                    right_children: vec![2, 0, 0],
                    is_leaf: vec![false, true, true],
                    leaf_values: vec![0.0, 1.0, 2.0],
                }],
            },
        });

        let bytes = postcard::to_allocvec(&payload).unwrap();
        let decoded: Payload = postcard::from_bytes(&bytes).unwrap();
        let Payload::V1(decoded) = decoded;
        assert_eq!(decoded.metadata.n_features, 8);
        assert_eq!(decoded.metadata.attribute("cv_r2"), Some("0.91"));
        assert_eq!(decoded.forest.trees.len(), 1);
        assert_eq!(decoded.forest.trees[0].leaf_values, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn missing_attribute_is_none() {
        let metadata = ModelMetadata::default();
        assert_eq!(metadata.attribute("anything"), None);
    }
}
