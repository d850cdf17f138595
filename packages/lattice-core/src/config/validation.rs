//! Configuration validation
//!
//! Every stage config implements [`Validatable`]; [`LatticeConfig`] validates
//! all of them plus the settings that span stages.

use super::error::{ConfigError, ConfigResult};
use super::lattice_config::LatticeConfig;

/// Trait for validatable configuration objects
pub trait Validatable {
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate complete configuration
    pub fn validate(config: &LatticeConfig) -> ConfigResult<()> {
        config.posterior.validate()?;
        config.prune.validate()?;
        config.merge.validate()?;
        config.collapse.validate()?;
        config.expand.validate()?;
        config.alignment.validate()?;

        // a recovered pause needs a word to recover
        if (config.collapse.loop_pauses || config.collapse.compact_pauses)
            && config.collapse.pause_word.is_none()
        {
            return Err(ConfigError::Validation(
                "collapse.loop_pauses/compact_pauses require collapse.pause_word".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate any Validatable config
    pub fn validate_config<V: Validatable>(config: &V) -> ConfigResult<()> {
        config.validate()
    }
}
