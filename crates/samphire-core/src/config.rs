//! # Configuration
//!
//! YAML-based configuration for the interrupt emitter: stream rate, the
//! late-drop policy, the drift tracking loop gain, and logging settings.
//! Invalid values are rejected at validation time, never clamped.
//!
//! ## Example Configuration
//!
//! ```yaml
//! rate: 2.4e6
//! drop_late: false
//! loop_gain: 0.0001
//! debug: false
//!
//! log:
//!   level: info
//!   format: compact
//! ```

use crate::observe::LogConfig;
use crate::timebase::DEFAULT_LOOP_GAIN;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error type for configuration operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Validation(String),
}

/// Emitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Nominal sample rate in Hz.
    pub rate: f64,
    /// Default policy for trigger requests whose target is already past.
    pub drop_late: bool,
    /// Clock drift tracking loop gain, in (0, 1].
    pub loop_gain: f64,
    /// Enable verbose per-pass diagnostics.
    pub debug: bool,
    /// Logging configuration.
    pub log: LogConfig,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            rate: 1_000_000.0,
            drop_late: false,
            loop_gain: DEFAULT_LOOP_GAIN,
            debug: false,
            log: LogConfig::default(),
        }
    }
}

impl EmitterConfig {
    /// Parse a configuration from a YAML string and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Serialize to a YAML string.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate all values, failing fast on the first offender.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "rate must be a positive number of Hz, got {}",
                self.rate
            )));
        }
        if !self.loop_gain.is_finite() || self.loop_gain <= 0.0 || self.loop_gain > 1.0 {
            return Err(ConfigError::Validation(format!(
                "loop_gain must be in (0, 1], got {}",
                self.loop_gain
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EmitterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.loop_gain, DEFAULT_LOOP_GAIN);
        assert!(!config.drop_late);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = EmitterConfig::default();
        config.rate = 48_000.0;
        config.drop_late = true;

        let yaml = config.to_yaml().unwrap();
        let parsed = EmitterConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.rate, 48_000.0);
        assert!(parsed.drop_late);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EmitterConfig::from_yaml("rate: 2400000.0\n").unwrap();
        assert_eq!(config.rate, 2_400_000.0);
        assert_eq!(config.loop_gain, DEFAULT_LOOP_GAIN);
        assert!(!config.debug);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let err = EmitterConfig::from_yaml("rate: -1.0\n").unwrap_err();
        assert!(err.to_string().contains("rate"));
    }

    #[test]
    fn test_out_of_range_gain_rejected() {
        let err = EmitterConfig::from_yaml("loop_gain: 1.5\n").unwrap_err();
        assert!(err.to_string().contains("loop_gain"));
        let err = EmitterConfig::from_yaml("loop_gain: 0.0\n").unwrap_err();
        assert!(err.to_string().contains("loop_gain"));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        assert!(matches!(
            EmitterConfig::from_yaml("rate: [not a number"),
            Err(ConfigError::Parse(_))
        ));
    }
}
