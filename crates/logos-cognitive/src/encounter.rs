//! Encounter aggregation
//!
//! Folds every recorded encounter into the per-(user, object)
//! relationship statistics with incremental running averages, then
//! refreshes the derived metrics: interpretation ratio, modality
//! balance, retrieval fluency, knowledge strength and estimated
//! learning cost.

use chrono::{DateTime, Utc};
use logos_core::entities::{ObjectEncounter, RelationshipStats};
use logos_core::numerics::{normalized_entropy, sigmoid};
use logos_types::InteractionCategory;
use serde::{Deserialize, Serialize};

/// Aggregator tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterConfig {
    /// Response time at which retrieval fluency sits at 0.5
    pub fluency_center_ms: f64,
    /// Width of the fluency sigmoid in milliseconds
    pub fluency_scale_ms: f64,
    /// Recency half-life in days
    pub recency_half_life_days: f64,
    /// Exposures at which the stalled-exposure penalty saturates
    pub stall_exposures: f64,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            fluency_center_ms: 2000.0,
            fluency_scale_ms: 500.0,
            recency_half_life_days: 30.0,
            stall_exposures: 20.0,
        }
    }
}

/// Incremental encounter aggregator
#[derive(Debug, Clone, Default)]
pub struct EncounterAggregator {
    config: EncounterConfig,
}

impl EncounterAggregator {
    pub fn new(config: EncounterConfig) -> Self {
        Self { config }
    }

    /// Fold one encounter into the stats and refresh the derived
    /// metrics. Running averages only; no second pass over history.
    pub fn record(&self, stats: &mut RelationshipStats, encounter: &ObjectEncounter) {
        stats.encounters = stats.encounters.saturating_add(1);
        *stats
            .counts_by_category
            .entry(encounter.category)
            .or_insert(0) += 1;
        *stats
            .counts_by_modality
            .entry(encounter.modality)
            .or_insert(0) += 1;
        *stats.domain_exposure.entry(encounter.domain).or_insert(0) += 1;
        if encounter.correct {
            *stats
                .success_by_category
                .entry(encounter.category)
                .or_insert(0) += 1;
            *stats
                .success_by_modality
                .entry(encounter.modality)
                .or_insert(0) += 1;
        }

        let n = stats.encounters as f64;
        stats.avg_response_ms +=
            (encounter.response_time_ms as f64 - stats.avg_response_ms) / n;
        stats.last_encounter = Some(encounter.occurred_at);

        self.refresh_derived(stats, encounter.difficulty_at_encounter, encounter.occurred_at);
    }

    /// Recompute the derived metrics from the raw aggregates
    pub fn refresh_derived(
        &self,
        stats: &mut RelationshipStats,
        item_difficulty: f64,
        now: DateTime<Utc>,
    ) {
        let interpretation = stats
            .counts_by_category
            .get(&InteractionCategory::Interpretation)
            .copied()
            .unwrap_or(0) as f64;
        let total = stats.encounters.max(1) as f64;
        stats.interpretation_ratio = interpretation / total;

        let modality_counts: Vec<f64> = stats
            .counts_by_modality
            .values()
            .map(|c| *c as f64)
            .collect();
        stats.modality_balance = normalized_entropy(&modality_counts);

        let category_counts: Vec<f64> = stats
            .counts_by_category
            .values()
            .map(|c| *c as f64)
            .collect();
        let category_balance = normalized_entropy(&category_counts);

        stats.retrieval_fluency = sigmoid(
            (self.config.fluency_center_ms - stats.avg_response_ms) / self.config.fluency_scale_ms,
        );

        let recency = match stats.last_encounter {
            Some(last) => {
                let days = ((now - last).num_seconds() as f64 / 86_400.0).max(0.0);
                (-(std::f64::consts::LN_2) * days / self.config.recency_half_life_days).exp()
            }
            None => 0.0,
        };

        let success = stats.success_rate();
        stats.knowledge_strength = (0.4 * success
            + 0.2 * stats.retrieval_fluency
            + 0.1 * stats.modality_balance
            + 0.1 * category_balance
            + 0.2 * recency)
            .clamp(0.0, 1.0);

        // base_cost = 0.3*sigmoid(b) + 0.4*(1 - success)
        //           + 0.3*(min(1, exposures/20) * (1 - strength))
        let stall = (total / self.config.stall_exposures).min(1.0)
            * (1.0 - stats.knowledge_strength);
        stats.learning_cost = (0.3 * sigmoid(item_difficulty) + 0.4 * (1.0 - success)
            + 0.3 * stall)
            .clamp(0.1, 1.0);
    }
}
