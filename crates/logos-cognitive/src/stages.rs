//! Mastery stage machine
//!
//! Threshold-checked promotions through the five mastery stages, the
//! single catastrophic-regression rule, the scaffolding cue-level
//! recommender, and deterministic A/B test assignment for threshold
//! experiments.

use logos_core::entities::{MasteryState, StageTransitionRecord};
use logos_types::{
    CueLevel, LogosError, MasteryStage, Result, SessionConfig, ThresholdConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Stage machine over a validated threshold configuration
#[derive(Debug, Clone)]
pub struct StageMachine {
    config: ThresholdConfig,
    /// Consecutive Again ratings that trigger a one-stage regression
    regression_threshold: usize,
}

impl StageMachine {
    /// Build a machine; the configuration is validated at registration
    pub fn new(config: ThresholdConfig, regression_threshold: usize) -> Result<Self> {
        config.validate()?;
        if regression_threshold == 0 {
            return Err(LogosError::InvalidInput(
                "regression threshold must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            config,
            regression_threshold,
        })
    }

    pub fn with_session_config(config: ThresholdConfig, session: &SessionConfig) -> Result<Self> {
        Self::new(config, session.regression_threshold)
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Check whether the mastery metrics clear the next stage's
    /// thresholds. At most one promotion per check; stage never jumps.
    pub fn check_transition(&self, mastery: &MasteryState) -> Option<StageTransitionRecord> {
        let t = &self.config;
        let promotion = match mastery.stage {
            MasteryStage::Unknown => {
                if mastery.cue_assisted_accuracy >= t.t1_assisted && mastery.exposure_count >= 1 {
                    Some((
                        MasteryStage::Recognition,
                        format!(
                            "cue_assisted {:.0}% reached {:.0}% with first exposure",
                            mastery.cue_assisted_accuracy * 100.0,
                            t.t1_assisted * 100.0
                        ),
                    ))
                } else {
                    None
                }
            }
            MasteryStage::Recognition => {
                let free_path = mastery.cue_free_accuracy >= t.t2_free;
                let assisted_path = mastery.cue_assisted_accuracy >= t.t2_assisted;
                if (free_path || assisted_path) && mastery.exposure_count >= 3 {
                    let path = if free_path {
                        format!("cue_free \u{2265} {:.0}%", t.t2_free * 100.0)
                    } else {
                        format!("cue_assisted \u{2265} {:.0}%", t.t2_assisted * 100.0)
                    };
                    Some((MasteryStage::Recall, format!("{} after 3 exposures", path)))
                } else {
                    None
                }
            }
            MasteryStage::Recall => {
                if mastery.cue_free_accuracy >= t.t3_free
                    && mastery.card.stability >= t.t3_stability
                {
                    Some((
                        MasteryStage::Production,
                        format!(
                            "cue_free \u{2265} {:.0}% with stability \u{2265} {:.0} days",
                            t.t3_free * 100.0,
                            t.t3_stability
                        ),
                    ))
                } else {
                    None
                }
            }
            MasteryStage::Production => {
                if mastery.cue_free_accuracy >= t.t4_free
                    && mastery.card.stability >= t.t4_stability
                    && mastery.scaffolding_gap() <= t.t4_gap
                {
                    Some((
                        MasteryStage::Automatic,
                        format!(
                            "cue_free \u{2265} {:.0}% with stability \u{2265} {:.0} days and gap \u{2264} {:.2}",
                            t.t4_free * 100.0,
                            t.t4_stability,
                            t.t4_gap
                        ),
                    ))
                } else {
                    None
                }
            }
            MasteryStage::Automatic => None,
        };

        promotion.map(|(to_stage, trigger)| {
            info!(
                object = %mastery.object_id,
                from = %mastery.stage,
                to = %to_stage,
                "stage promotion"
            );
            StageTransitionRecord::from_mastery(mastery, to_stage, trigger)
        })
    }

    /// Catastrophic regression: after a streak of Again ratings at or
    /// beyond the threshold, the stage drops exactly one level. The
    /// record's trigger is always the literal "regression".
    pub fn check_regression(&self, mastery: &MasteryState) -> Option<StageTransitionRecord> {
        if mastery.stage == MasteryStage::Unknown {
            return None;
        }
        if (mastery.again_streak as usize) < self.regression_threshold {
            return None;
        }
        let to_stage = mastery.stage.prev();
        info!(
            object = %mastery.object_id,
            from = %mastery.stage,
            to = %to_stage,
            streak = mastery.again_streak,
            "stage regression"
        );
        Some(StageTransitionRecord::from_mastery(
            mastery, to_stage, "regression",
        ))
    }
}

/// Scaffolding recommendation from the accuracy gap and exposure:
/// learners who perform as well without cues stop receiving them
pub fn recommend_cue_level(
    cue_free_accuracy: f64,
    cue_assisted_accuracy: f64,
    exposure_count: u32,
) -> CueLevel {
    let gap = cue_assisted_accuracy - cue_free_accuracy;
    if gap < 0.1 && exposure_count > 5 {
        CueLevel::None
    } else if gap < 0.2 && exposure_count > 3 {
        CueLevel::Minimal
    } else if gap < 0.3 {
        CueLevel::Moderate
    } else {
        CueLevel::Maximum
    }
}

/// One experimental group with its share of the population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbGroup {
    pub name: String,
    pub proportion: f64,
}

/// A registered A/B experiment over threshold configurations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTest {
    pub id: String,
    pub groups: Vec<AbGroup>,
}

impl AbTest {
    /// Register an experiment; group proportions must sum to 1 within
    /// one part in a thousand
    pub fn new(id: impl Into<String>, groups: Vec<AbGroup>) -> Result<Self> {
        if groups.is_empty() {
            return Err(LogosError::InvalidInput(
                "A/B test needs at least one group".to_string(),
            ));
        }
        if groups.iter().any(|g| g.proportion < 0.0) {
            return Err(LogosError::InvalidInput(
                "group proportions must be non-negative".to_string(),
            ));
        }
        let sum: f64 = groups.iter().map(|g| g.proportion).sum();
        if (sum - 1.0).abs() > 1e-3 {
            return Err(LogosError::InvalidInput(format!(
                "group proportions sum to {}, expected 1",
                sum
            )));
        }
        Ok(Self {
            id: id.into(),
            groups,
        })
    }

    /// Deterministic group for a user: FNV-1a over "user:test" mapped to
    /// [0, 1) and bucketed by cumulative proportion. The same (user,
    /// test) pair always lands in the same group.
    pub fn assign(&self, user_id: &str) -> &str {
        let point = hash_unit_interval(user_id, &self.id);
        let mut cumulative = 0.0;
        for group in &self.groups {
            cumulative += group.proportion;
            if point < cumulative {
                return &group.name;
            }
        }
        // Floating-point shortfall at the top of the range
        &self.groups[self.groups.len() - 1].name
    }
}

/// FNV-1a 64-bit hash of "user:test" scaled into [0, 1)
fn hash_unit_interval(user_id: &str, test_id: &str) -> f64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for byte in user_id.bytes().chain([b':']).chain(test_id.bytes()) {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash as f64 / (u64::MAX as f64 + 1.0)
}

/// Append-only store of resolved (user, test) assignments
#[derive(Debug, Clone, Default)]
pub struct AbAssignments {
    resolved: HashMap<(String, String), String>,
}

impl AbAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an assignment, recording it on first use. Re-resolving
    /// returns the recorded group even if the test definition changed.
    pub fn resolve(&mut self, test: &AbTest, user_id: &str) -> String {
        let key = (user_id.to_string(), test.id.clone());
        if let Some(existing) = self.resolved.get(&key) {
            return existing.clone();
        }
        let group = test.assign(user_id).to_string();
        self.resolved.insert(key, group.clone());
        group
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
