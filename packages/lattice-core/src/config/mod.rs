//! Lattice configuration
//!
//! Two levels:
//! - Preset: `LatticeConfig::from_preset(Preset::Fast)`
//! - YAML: `LatticeConfig::from_yaml("lattice.yaml")` with per-stage overrides
//!
//! # Examples
//!
//! ```rust,ignore
//! use lattice_core::config::{LatticeConfig, Preset};
//!
//! let mut config = LatticeConfig::from_preset(Preset::Balanced);
//! config.prune.threshold = 0.01;
//! config.validate()?;
//! ```

pub mod error;
pub mod io;
pub mod lattice_config;
pub mod preset;
pub mod stage_configs;
pub mod validation;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use io::{ConfigExportV1, ConfigOverrides};
pub use lattice_config::LatticeConfig;
pub use preset::Preset;
pub use stage_configs::{
    AdjacencyBackend, AlignmentCosts, CollapseConfig, ExpandConfig, MergeConfig,
    PosteriorConfig, PosteriorNormalization, PruneConfig,
};
pub use validation::{ConfigValidator, Validatable};
