//! Top-level lattice configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::io::{ConfigExportV1, ConfigOverrides};
use super::preset::Preset;
use super::stage_configs::*;
use super::validation::ConfigValidator;

/// Settings for every lattice operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    pub preset: Preset,
    pub adjacency: AdjacencyBackend,
    pub posterior: PosteriorConfig,
    pub prune: PruneConfig,
    pub merge: MergeConfig,
    pub collapse: CollapseConfig,
    pub expand: ExpandConfig,
    pub alignment: AlignmentCosts,
}

impl LatticeConfig {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            preset,
            merge: MergeConfig::from_preset(preset),
            ..Self::default()
        }
    }

    /// Validate all stages
    pub fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate(self)
    }

    /// Load configuration from a YAML file (schema v1)
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        if export.version != 1 {
            return Err(ConfigError::UnsupportedVersion {
                found: export.version,
                supported: vec![1],
            });
        }

        let preset = Preset::from_str(&export.preset)
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;

        let mut config = Self::from_preset(preset);
        if let Some(adjacency) = export.adjacency {
            config.adjacency = adjacency;
        }

        if let Some(overrides) = export.overrides {
            if let Some(posterior) = overrides.posterior {
                config.posterior = posterior;
            }
            if let Some(prune) = overrides.prune {
                config.prune = prune;
            }
            if let Some(merge) = overrides.merge {
                config.merge = merge;
            }
            if let Some(collapse) = overrides.collapse {
                config.collapse = collapse;
            }
            if let Some(expand) = overrides.expand {
                config.expand = expand;
            }
            if let Some(alignment) = overrides.alignment {
                config.alignment = alignment;
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Export configuration to YAML (schema v1)
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: 1,
            preset: self.preset.to_string(),
            adjacency: Some(self.adjacency),
            overrides: Some(ConfigOverrides {
                posterior: Some(self.posterior.clone()),
                prune: Some(self.prune.clone()),
                merge: Some(self.merge.clone()),
                collapse: Some(self.collapse.clone()),
                expand: Some(self.expand.clone()),
                alignment: Some(self.alignment),
            }),
        };

        serde_yaml::to_string(&export).map_err(ConfigError::Yaml)
    }
}
