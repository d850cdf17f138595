//! Configuration I/O (YAML schema)
//!
//! Defines YAML schema types. Loading and export live in lattice_config.rs.

use serde::{Deserialize, Serialize};

use super::stage_configs::*;

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    pub preset: String,

    /// Adjacency backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjacency: Option<AdjacencyBackend>,

    /// Fine-grained overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ConfigOverrides>,
}

/// Configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posterior: Option<PosteriorConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prune: Option<PruneConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapse: Option<CollapseConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand: Option<ExpandConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<AlignmentCosts>,
}
