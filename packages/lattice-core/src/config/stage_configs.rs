//! Stage-specific configuration types
//!
//! Each lattice operation has its own configuration struct with validation.

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::Validatable;
use crate::shared::constants::{alignment, expansion, merge, pause};
use crate::shared::models::CombinePolicy;

// ============================================================================
// Adjacency storage
// ============================================================================

/// Backend used for every node's adjacency maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjacencyBackend {
    /// Hash tables (fast lookup, unordered)
    #[default]
    Hashed,
    /// Sorted arrays (compact, ordered)
    Sorted,
}

// ============================================================================
// Forward-backward
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosteriorConfig {
    /// Transition weights are divided by this scale before summing paths
    pub posterior_scale: f64,
}

impl Default for PosteriorConfig {
    fn default() -> Self {
        Self {
            posterior_scale: 1.0,
        }
    }
}

impl Validatable for PosteriorConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(self.posterior_scale > 0.0) || !self.posterior_scale.is_finite() {
            return Err(ConfigError::Validation(format!(
                "posterior_scale must be positive, got {}",
                self.posterior_scale
            )));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "PosteriorConfig"
    }
}

// ============================================================================
// Pruning
// ============================================================================

/// Reference mass node posteriors are normalized by before thresholding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosteriorNormalization {
    /// Bottleneck (max-min) posterior: nodes on the best path never fall
    /// below the threshold, so pruning always leaves a complete path
    #[default]
    MaxMin,
    /// Total lattice posterior
    Total,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Normalized posterior below which nodes are removed (0 disables)
    pub threshold: f64,

    pub normalization: PosteriorNormalization,

    /// Upper bound on forward-backward/prune rounds (1..=10000)
    pub max_iterations: usize,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            normalization: PosteriorNormalization::MaxMin,
            max_iterations: 100,
        }
    }
}

impl Validatable for PruneConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::range_with_hint(
                "threshold",
                self.threshold,
                0.0,
                1.0,
                "Posterior threshold is a probability",
            ));
        }
        if self.max_iterations == 0 || self.max_iterations > 10000 {
            return Err(ConfigError::range_with_hint(
                "max_iterations",
                self.max_iterations,
                1,
                10000,
                "Pruning rounds must be finite",
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "PruneConfig"
    }
}

// ============================================================================
// Minimization
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Fraction of neighbor sets that must overlap for an approximate merge
    /// (0 runs exact merging only)
    pub overlap_ratio: f64,

    /// Base the overlap on the larger neighbor set instead of the smaller one
    pub overlap_base_larger: bool,

    /// Single backward exact pass instead of iterating to a fixed point
    pub fast: bool,

    /// Weight combination for transitions that land on the same pair of nodes
    pub combine: CombinePolicy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            overlap_ratio: 0.0,
            overlap_base_larger: false,
            fast: false,
            combine: CombinePolicy::Max,
        }
    }
}

impl MergeConfig {
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                fast: true,
                ..Self::default()
            },
            Preset::Balanced => Self::default(),
            Preset::Thorough => Self {
                overlap_ratio: merge::THOROUGH_OVERLAP_RATIO,
                ..Self::default()
            },
        }
    }
}

impl Validatable for MergeConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.overlap_ratio) {
            return Err(ConfigError::range_with_hint(
                "overlap_ratio",
                self.overlap_ratio,
                0.0,
                1.0,
                "Overlap is a fraction of the neighbor set",
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "MergeConfig"
    }
}

// ============================================================================
// Null / pause collapsing
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapseConfig {
    /// Word treated as an optional pause
    pub pause_word: Option<String>,

    /// Give recovered pause nodes a self-loop
    pub loop_pauses: bool,

    /// Share one recovered pause node per source node
    pub compact_pauses: bool,

    /// Self-loop probability of recovered pause nodes (0 < p < 1)
    pub pause_loop_prob: f64,
}

impl Default for CollapseConfig {
    fn default() -> Self {
        Self {
            pause_word: None,
            loop_pauses: false,
            compact_pauses: false,
            pause_loop_prob: pause::DEFAULT_LOOP_PROB,
        }
    }
}

impl Validatable for CollapseConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(self.pause_loop_prob > 0.0 && self.pause_loop_prob < 1.0) {
            return Err(ConfigError::range_with_hint(
                "pause_loop_prob",
                self.pause_loop_prob,
                0.0,
                1.0,
                "A self-loop needs some probability of leaving the node",
            ));
        }
        if let Some(word) = &self.pause_word {
            if word.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "pause_word must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "CollapseConfig"
    }
}

// ============================================================================
// Context expansion
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandConfig {
    /// N-gram order of the expanded lattice (2..=9)
    pub order: usize,

    /// Node budget; expansion aborts once exceeded (0 = unbounded)
    pub max_nodes: usize,

    /// Log10 tolerance under which a cached context node is reused
    pub tolerance: f64,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            order: expansion::DEFAULT_ORDER,
            max_nodes: 0,
            tolerance: expansion::WEIGHT_TOLERANCE,
        }
    }
}

impl Validatable for ExpandConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.order < 2 || self.order > expansion::MAX_ORDER {
            return Err(ConfigError::range_with_hint(
                "order",
                self.order,
                2,
                expansion::MAX_ORDER,
                "Bigram lattices are the smallest meaningful expansion target",
            ));
        }
        if !(self.tolerance >= 0.0) {
            return Err(ConfigError::Validation(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "ExpandConfig"
    }
}

// ============================================================================
// Alignment
// ============================================================================

/// Edit costs for lattice word-error scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentCosts {
    pub substitution: u32,
    pub insertion: u32,
    pub deletion: u32,
}

impl Default for AlignmentCosts {
    fn default() -> Self {
        Self {
            substitution: alignment::SUBSTITUTION_COST,
            insertion: alignment::INSERTION_COST,
            deletion: alignment::DELETION_COST,
        }
    }
}

impl Validatable for AlignmentCosts {
    fn validate(&self) -> ConfigResult<()> {
        if self.insertion == 0 || self.deletion == 0 {
            return Err(ConfigError::Validation(
                "insertion and deletion costs must be positive".to_string(),
            ));
        }
        if self.substitution > self.insertion + self.deletion {
            return Err(ConfigError::Validation(format!(
                "substitution cost {} exceeds insertion + deletion ({}), substitutions would never be chosen",
                self.substitution,
                self.insertion + self.deletion
            )));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "AlignmentCosts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_threshold_range() {
        let mut config = PruneConfig::default();
        assert!(config.validate().is_ok());
        config.threshold = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Range { .. })));
    }

    #[test]
    fn test_merge_presets() {
        assert!(MergeConfig::from_preset(Preset::Fast).fast);
        assert_eq!(MergeConfig::from_preset(Preset::Balanced).overlap_ratio, 0.0);
        assert!(MergeConfig::from_preset(Preset::Thorough).overlap_ratio > 0.0);
    }

    #[test]
    fn test_expand_order_range() {
        let mut config = ExpandConfig::default();
        assert_eq!(config.order, 3);
        config.order = 1;
        assert!(config.validate().is_err());
        config.order = 12;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alignment_defaults() {
        let costs = AlignmentCosts::default();
        assert_eq!((costs.substitution, costs.insertion, costs.deletion), (4, 3, 3));
        assert!(costs.validate().is_ok());
    }

    #[test]
    fn test_posterior_scale_must_be_positive() {
        let config = PosteriorConfig {
            posterior_scale: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_collapse_loop_prob() {
        let mut config = CollapseConfig::default();
        config.pause_loop_prob = 1.0;
        assert!(config.validate().is_err());
    }
}
