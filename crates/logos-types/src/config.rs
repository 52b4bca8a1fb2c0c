//! Cross-crate configuration shared by the session pipeline

use crate::error::{LogosError, Result};
use serde::{Deserialize, Serialize};

/// Session-level knobs consumed by the queue builder and the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of items a built session queue may contain
    pub session_size: usize,
    /// Desired share of new (never-reviewed) items in a queue, 0.0-1.0
    pub new_item_ratio: f64,
    /// Maximum consecutive tasks of the same type in one queue
    pub max_per_type: usize,
    /// Content-oracle call timeout in seconds
    pub oracle_timeout_secs: u64,
    /// Consecutive Again ratings required before a stage regression
    pub regression_threshold: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_size: 20,
            new_item_ratio: 0.3,
            max_per_type: 2,
            oracle_timeout_secs: 30,
            regression_threshold: 3,
        }
    }
}

/// Task cache bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached task contents
    pub capacity: usize,
    /// Time-to-live for a cached entry in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_secs: 30 * 60,
        }
    }
}

/// Token-bucket parameters for outbound oracle calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Bucket capacity in tokens
    pub capacity: u32,
    /// Refill rate in tokens per second
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_per_sec: 1.0,
        }
    }
}

/// Stage-transition thresholds. Registration rejects configurations that
/// break the stage hierarchy (see [`ThresholdConfig::validate`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Stage 0 -> 1: minimum cue-assisted accuracy
    pub t1_assisted: f64,
    /// Stage 1 -> 2: minimum cue-free accuracy (or `t2_assisted`)
    pub t2_free: f64,
    /// Stage 1 -> 2: alternative cue-assisted accuracy path
    pub t2_assisted: f64,
    /// Stage 2 -> 3: minimum cue-free accuracy
    pub t3_free: f64,
    /// Stage 2 -> 3: minimum stability in days
    pub t3_stability: f64,
    /// Stage 3 -> 4: minimum cue-free accuracy
    pub t4_free: f64,
    /// Stage 3 -> 4: minimum stability in days
    pub t4_stability: f64,
    /// Stage 3 -> 4: maximum scaffolding gap
    pub t4_gap: f64,
}

/// Named threshold presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdPreset {
    Default,
    Conservative,
    Aggressive,
    Research,
}

impl ThresholdConfig {
    pub fn preset(preset: ThresholdPreset) -> Self {
        match preset {
            ThresholdPreset::Default => Self {
                t1_assisted: 0.6,
                t2_free: 0.7,
                t2_assisted: 0.85,
                t3_free: 0.8,
                t3_stability: 7.0,
                t4_free: 0.9,
                t4_stability: 30.0,
                t4_gap: 0.1,
            },
            ThresholdPreset::Conservative => Self {
                t1_assisted: 0.7,
                t2_free: 0.8,
                t2_assisted: 0.9,
                t3_free: 0.85,
                t3_stability: 14.0,
                t4_free: 0.95,
                t4_stability: 45.0,
                t4_gap: 0.05,
            },
            ThresholdPreset::Aggressive => Self {
                t1_assisted: 0.5,
                t2_free: 0.6,
                t2_assisted: 0.75,
                t3_free: 0.7,
                t3_stability: 5.0,
                t4_free: 0.85,
                t4_stability: 21.0,
                t4_gap: 0.15,
            },
            ThresholdPreset::Research => Self {
                t1_assisted: 0.6,
                t2_free: 0.75,
                t2_assisted: 0.85,
                t3_free: 0.8,
                t3_stability: 10.0,
                t4_free: 0.9,
                t4_stability: 30.0,
                t4_gap: 0.1,
            },
        }
    }

    /// Enforce the stage hierarchy: accuracy thresholds non-decreasing
    /// up the stages, positive stabilities, accuracies and gaps in [0, 1]
    pub fn validate(&self) -> Result<()> {
        let accuracies = [
            self.t1_assisted,
            self.t2_free,
            self.t2_assisted,
            self.t3_free,
            self.t4_free,
            self.t4_gap,
        ];
        if accuracies.iter().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(LogosError::InvalidInput(
                "threshold accuracies and gaps must lie in [0, 1]".to_string(),
            ));
        }
        if self.t3_stability <= 0.0 || self.t4_stability <= 0.0 {
            return Err(LogosError::InvalidInput(
                "threshold stabilities must be positive".to_string(),
            ));
        }
        if !(self.t4_free >= self.t3_free && self.t3_free >= self.t2_free) {
            return Err(LogosError::InvalidInput(
                "cue-free thresholds must be non-decreasing across stages".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::preset(ThresholdPreset::Default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.session_size, 20);
        assert_eq!(config.max_per_type, 2);
        assert_eq!(config.regression_threshold, 3);
        assert!(config.new_item_ratio > 0.0 && config.new_item_ratio < 1.0);
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 1000);
        assert_eq!(config.ttl_secs, 1800);
    }

    #[test]
    fn test_all_presets_validate() {
        for preset in [
            ThresholdPreset::Default,
            ThresholdPreset::Conservative,
            ThresholdPreset::Aggressive,
            ThresholdPreset::Research,
        ] {
            assert!(ThresholdConfig::preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_hierarchy_violation_rejected() {
        let mut config = ThresholdConfig::default();
        config.t4_free = config.t3_free - 0.1;
        assert!(config.validate().is_err());

        let mut config = ThresholdConfig::default();
        config.t3_stability = 0.0;
        assert!(config.validate().is_err());

        let mut config = ThresholdConfig::default();
        config.t2_free = 1.4;
        assert!(config.validate().is_err());
    }
}
