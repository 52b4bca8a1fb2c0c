//! Configuration loading
//!
//! The top-level configuration aggregate, loadable from a TOML file with
//! environment-variable overrides under the `LOGOS_` prefix. Every
//! section falls back to its documented defaults, so an empty file and a
//! missing file are both valid configurations.

use logos_types::{
    CacheConfig, LogosError, RateLimitConfig, Result, SessionConfig, ThresholdConfig,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level configuration for the learning core
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogosConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

impl LogosConfig {
    /// Load from a TOML file, then apply environment overrides and
    /// validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: LogosConfig = toml::from_str(&raw)
            .map_err(|e| LogosError::ConfigError(format!("invalid TOML: {}", e)))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        let mut config = LogosConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("LOGOS_SESSION_SIZE") {
            self.session.session_size = value.parse().map_err(|_| {
                LogosError::ConfigError(format!("LOGOS_SESSION_SIZE '{}' is not a count", value))
            })?;
        }
        if let Ok(value) = env::var("LOGOS_ORACLE_TIMEOUT_SECS") {
            self.session.oracle_timeout_secs = value.parse().map_err(|_| {
                LogosError::ConfigError(format!(
                    "LOGOS_ORACLE_TIMEOUT_SECS '{}' is not a number of seconds",
                    value
                ))
            })?;
        }
        if let Ok(value) = env::var("LOGOS_CACHE_CAPACITY") {
            self.cache.capacity = value.parse().map_err(|_| {
                LogosError::ConfigError(format!("LOGOS_CACHE_CAPACITY '{}' is not a count", value))
            })?;
        }
        if let Ok(value) = env::var("LOGOS_RATE_LIMIT_CAPACITY") {
            self.rate_limit.capacity = value.parse().map_err(|_| {
                LogosError::ConfigError(format!(
                    "LOGOS_RATE_LIMIT_CAPACITY '{}' is not a count",
                    value
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.session_size == 0 {
            return Err(LogosError::ConfigError(
                "session_size must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.session.new_item_ratio) {
            return Err(LogosError::ConfigError(
                "new_item_ratio must lie in [0, 1]".to_string(),
            ));
        }
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = LogosConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.session_size, 20);
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.rate_limit.capacity, 10);
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[session]\nsession_size = 12\nnew_item_ratio = 0.4\nmax_per_type = 3\noracle_timeout_secs = 10\nregression_threshold = 4\n"
        )
        .unwrap();
        let config = LogosConfig::from_file(file.path()).unwrap();
        assert_eq!(config.session.session_size, 12);
        // Unspecified sections keep their defaults
        assert_eq!(config.cache.capacity, 1000);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "session = 'not a table'").unwrap();
        assert!(LogosConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = LogosConfig::default();
        config.session.session_size = 0;
        assert!(config.validate().is_err());

        let mut config = LogosConfig::default();
        config.session.new_item_ratio = 1.5;
        assert!(config.validate().is_err());

        let mut config = LogosConfig::default();
        config.thresholds.t4_free = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(LogosConfig::from_file("/nonexistent/logos.toml").is_err());
    }
}
