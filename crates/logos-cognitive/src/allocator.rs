//! Multi-curriculum time allocation
//!
//! Samples candidate allocations of session time across active goals,
//! evaluates each for expected progress, efficiency and deadline risk,
//! keeps the Pareto-non-dominated frontier, and selects from it
//! according to the caller's preference. Shared objects earn a synergy
//! bonus that rewards allocations covering all their benefiting goals.

use chrono::{DateTime, Utc};
use logos_core::entities::{CurriculumGoal, ParetoSolution, SharedObject};
use logos_types::{LogosError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Allocator tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Random candidates sampled on top of the strategic seeds
    pub random_candidates: usize,
    /// Minimum share any goal receives
    pub floor: f64,
    /// Maximum share any goal receives
    pub ceiling: f64,
    /// Coefficient of the shared-object synergy bonus
    pub synergy_coefficient: f64,
    /// Scale of the square-root learning curve
    pub progress_rate: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            random_candidates: 20,
            floor: 0.05,
            ceiling: 0.80,
            synergy_coefficient: 0.2,
            progress_rate: 0.1,
        }
    }
}

/// Frontier selection strategies
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SelectionPreference {
    /// Minimize the variance of per-goal progress
    Balanced,
    /// Minimize total deadline risk
    DeadlineFocused,
    /// Maximize total expected progress
    ProgressFocused,
    /// Maximize efficiency (shared-object coverage)
    SynergyFocused,
    /// Weighted blend of progress, risk and efficiency
    Custom {
        progress_weight: f64,
        risk_weight: f64,
        efficiency_weight: f64,
    },
}

/// Result of one allocation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// Non-dominated solutions, in no particular order
    pub frontier: Vec<ParetoSolution>,
    pub selected: ParetoSolution,
}

/// Priority boost for an object shared by k goals: ln(1 + k) / ln 5.
/// Unshared objects are left untouched.
pub fn shared_priority_boost(goal_count: usize) -> f64 {
    if goal_count <= 1 {
        return 1.0;
    }
    (1.0 + goal_count as f64).ln() / 5.0_f64.ln()
}

/// Synergy bonus of one shared object: (k - 1) * c * mean(benefit)
fn synergy_bonus(shared: &SharedObject, coefficient: f64) -> f64 {
    let k = shared.goal_count();
    if k <= 1 {
        return 0.0;
    }
    let mean_benefit: f64 = shared
        .benefiting_goals
        .iter()
        .map(|b| b.relevance)
        .sum::<f64>()
        / k as f64;
    (k - 1) as f64 * coefficient * mean_benefit
}

/// The multi-goal Pareto allocator. Deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct CurriculumAllocator {
    config: AllocatorConfig,
    rng: StdRng,
}

impl CurriculumAllocator {
    pub fn new(config: AllocatorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Allocate a session across goals and pick from the frontier
    pub fn allocate(
        &mut self,
        goals: &[CurriculumGoal],
        shared: &[SharedObject],
        session_minutes: f64,
        preference: SelectionPreference,
        now: DateTime<Utc>,
    ) -> Result<AllocationOutcome> {
        if goals.is_empty() {
            return Err(LogosError::InvalidInput(
                "allocation needs at least one goal".to_string(),
            ));
        }
        if session_minutes <= 0.0 {
            return Err(LogosError::InvalidInput(
                "session minutes must be positive".to_string(),
            ));
        }

        let candidates = self.candidate_allocations(goals, now);
        let mut solutions: Vec<ParetoSolution> = candidates
            .into_iter()
            .map(|allocation| self.evaluate(goals, shared, session_minutes, allocation, now))
            .collect();

        mark_dominated(&mut solutions);
        let frontier: Vec<ParetoSolution> = solutions
            .iter()
            .filter(|s| !s.dominated)
            .cloned()
            .collect();

        let selected = select(&frontier, preference).ok_or_else(|| {
            LogosError::NumericSingularity("empty Pareto frontier".to_string())
        })?;

        Ok(AllocationOutcome { frontier, selected })
    }

    /// Strategic seeds plus uniform-random candidates, all normalized to
    /// the floor/ceiling box
    fn candidate_allocations(
        &mut self,
        goals: &[CurriculumGoal],
        now: DateTime<Utc>,
    ) -> Vec<Vec<f64>> {
        let n = goals.len();
        let mut candidates = Vec::with_capacity(self.config.random_candidates + 3);

        // Equal split
        candidates.push(vec![1.0 / n as f64; n]);

        // Deadline-weighted: closer deadlines draw more time
        let deadline_weights: Vec<f64> = goals
            .iter()
            .map(|goal| match goal.deadline {
                Some(deadline) => {
                    let days = ((deadline - now).num_seconds() as f64 / 86_400.0).max(0.5);
                    goal.weight / days
                }
                None => goal.weight * 0.01,
            })
            .collect();
        candidates.push(normalize_weights(&deadline_weights));

        // Progress-weighted: larger remaining gaps draw more time
        let gap_weights: Vec<f64> = goals
            .iter()
            .map(|goal| goal.weight * (goal.gap() + 0.1))
            .collect();
        candidates.push(normalize_weights(&gap_weights));

        for _ in 0..self.config.random_candidates {
            let raw: Vec<f64> = (0..n).map(|_| self.rng.gen_range(0.01..1.0)).collect();
            candidates.push(normalize_weights(&raw));
        }

        candidates
            .into_iter()
            .map(|allocation| self.apply_bounds(allocation))
            .collect()
    }

    /// Clamp into [floor, ceiling] and redistribute until the shares sum
    /// to 1. The box is always feasible because floor <= 1/n <= ceiling.
    fn apply_bounds(&self, mut allocation: Vec<f64>) -> Vec<f64> {
        let n = allocation.len();
        if n == 1 {
            return vec![1.0];
        }
        let floor = self.config.floor.min(1.0 / n as f64);
        let ceiling = self.config.ceiling.max(1.0 / n as f64);

        let sum: f64 = allocation.iter().sum();
        if sum > 0.0 {
            for share in allocation.iter_mut() {
                *share /= sum;
            }
        } else {
            allocation = vec![1.0 / n as f64; n];
        }

        for _ in 0..8 {
            for share in allocation.iter_mut() {
                *share = share.clamp(floor, ceiling);
            }
            let sum: f64 = allocation.iter().sum();
            let deficit = 1.0 - sum;
            if deficit.abs() < 1e-9 {
                break;
            }
            // Spread the deficit across entries with room to move
            let adjustable: Vec<usize> = allocation
                .iter()
                .enumerate()
                .filter(|(_, share)| {
                    if deficit > 0.0 {
                        **share < ceiling - 1e-12
                    } else {
                        **share > floor + 1e-12
                    }
                })
                .map(|(i, _)| i)
                .collect();
            if adjustable.is_empty() {
                break;
            }
            let step = deficit / adjustable.len() as f64;
            for index in adjustable {
                allocation[index] += step;
            }
        }
        allocation
    }

    /// Expected progress follows a square-root learning curve with
    /// diminishing returns in the current ability and the closing gap
    fn evaluate(
        &self,
        goals: &[CurriculumGoal],
        shared: &[SharedObject],
        session_minutes: f64,
        allocation: Vec<f64>,
        now: DateTime<Utc>,
    ) -> ParetoSolution {
        let expected_progress: Vec<f64> = goals
            .iter()
            .zip(&allocation)
            .map(|(goal, share)| {
                let minutes = share * session_minutes;
                let level_factor = (-0.3 * goal.current_theta).exp().min(2.0);
                let gap_factor = (goal.gap() / 4.0).clamp(0.0, 1.0);
                self.config.progress_rate
                    * minutes.max(0.0).sqrt()
                    * level_factor
                    * gap_factor
                    * goal.weight
            })
            .collect();

        let total_progress: f64 = expected_progress.iter().sum();

        // Efficiency: progress plus synergy bonuses weighted by how well
        // the allocation covers each shared object's benefiting goals
        let mut efficiency = total_progress;
        for shared_object in shared {
            let bonus = synergy_bonus(shared_object, self.config.synergy_coefficient);
            if bonus <= 0.0 {
                continue;
            }
            let coverage: f64 = shared_object
                .benefiting_goals
                .iter()
                .filter_map(|benefit| {
                    goals
                        .iter()
                        .position(|g| g.goal_id == benefit.goal_id)
                        .map(|index| allocation[index])
                })
                .sum::<f64>()
                / shared_object.goal_count().max(1) as f64;
            efficiency += bonus * coverage;
        }

        // Deadline risk: unclosed gap share scaled by deadline pressure
        let deadline_risk: f64 = goals
            .iter()
            .zip(&expected_progress)
            .map(|(goal, progress)| match goal.deadline {
                Some(deadline) => {
                    let days = ((deadline - now).num_seconds() as f64 / 86_400.0).max(0.0);
                    let gap = goal.gap().max(1e-9);
                    let unclosed = ((gap - progress) / gap).clamp(0.0, 1.0);
                    let pressure = 1.0 / (1.0 + days / 7.0);
                    goal.weight * unclosed * pressure
                }
                None => 0.0,
            })
            .sum();

        ParetoSolution {
            allocation,
            expected_progress,
            efficiency,
            deadline_risk,
            dominated: false,
        }
    }
}

/// Scale non-negative weights into shares summing to 1; degenerate
/// inputs fall back to an even split
fn normalize_weights(weights: &[f64]) -> Vec<f64> {
    let n = weights.len().max(1);
    let cleaned: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    let sum: f64 = cleaned.iter().sum();
    if sum <= 0.0 {
        return vec![1.0 / n as f64; n];
    }
    cleaned.into_iter().map(|w| w / sum).collect()
}

/// A dominates B iff A's progress is >= B's for every goal and strictly
/// greater for at least one
fn dominates(a: &ParetoSolution, b: &ParetoSolution) -> bool {
    let mut strictly_better = false;
    for (pa, pb) in a.expected_progress.iter().zip(&b.expected_progress) {
        if pa < pb {
            return false;
        }
        if pa > pb {
            strictly_better = true;
        }
    }
    strictly_better
}

fn mark_dominated(solutions: &mut [ParetoSolution]) {
    let snapshot: Vec<ParetoSolution> = solutions.to_vec();
    for solution in solutions.iter_mut() {
        solution.dominated = snapshot.iter().any(|other| dominates(other, solution));
    }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn select(
    frontier: &[ParetoSolution],
    preference: SelectionPreference,
) -> Option<ParetoSolution> {
    let key = |solution: &ParetoSolution| -> f64 {
        match preference {
            // Lower is better for these two; negate so max_by works
            SelectionPreference::Balanced => -variance(&solution.expected_progress),
            SelectionPreference::DeadlineFocused => -solution.deadline_risk,
            SelectionPreference::ProgressFocused => solution.expected_progress.iter().sum(),
            SelectionPreference::SynergyFocused => solution.efficiency,
            SelectionPreference::Custom {
                progress_weight,
                risk_weight,
                efficiency_weight,
            } => {
                progress_weight * solution.expected_progress.iter().sum::<f64>()
                    - risk_weight * solution.deadline_risk
                    + efficiency_weight * solution.efficiency
            }
        }
    };
    frontier
        .iter()
        .max_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use logos_core::entities::GoalBenefit;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn goal(
        current_theta: f64,
        target_theta: f64,
        weight: f64,
        deadline_days: Option<i64>,
        now: DateTime<Utc>,
    ) -> CurriculumGoal {
        CurriculumGoal {
            goal_id: Uuid::new_v4(),
            current_theta,
            target_theta,
            weight,
            deadline: deadline_days.map(|d| now + Duration::days(d)),
            modalities: BTreeSet::new(),
        }
    }

    #[test]
    fn test_allocation_sums_to_one_within_bounds() {
        let now = Utc::now();
        let goals = vec![
            goal(0.0, 2.0, 1.0, Some(14), now),
            goal(1.0, 2.0, 0.5, None, now),
            goal(-1.0, 1.0, 0.8, Some(60), now),
        ];
        let mut allocator = CurriculumAllocator::new(AllocatorConfig::default(), 7);
        let outcome = allocator
            .allocate(&goals, &[], 30.0, SelectionPreference::ProgressFocused, now)
            .unwrap();
        for solution in outcome.frontier.iter().chain(Some(&outcome.selected)) {
            let sum: f64 = solution.allocation.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6, "allocation sums to {}", sum);
            for share in &solution.allocation {
                assert!(*share >= 0.05 - 1e-9 && *share <= 0.80 + 1e-9);
            }
        }
    }

    #[test]
    fn test_frontier_is_mutually_non_dominated() {
        let now = Utc::now();
        let goals = vec![
            goal(0.0, 3.0, 1.0, Some(7), now),
            goal(0.5, 2.0, 1.0, None, now),
        ];
        let mut allocator = CurriculumAllocator::new(AllocatorConfig::default(), 11);
        let outcome = allocator
            .allocate(&goals, &[], 45.0, SelectionPreference::Balanced, now)
            .unwrap();
        for a in &outcome.frontier {
            for b in &outcome.frontier {
                assert!(!dominates(a, b) || a.allocation == b.allocation);
            }
        }
    }

    #[test]
    fn test_deadline_focus_favors_urgent_goal() {
        let now = Utc::now();
        // Goal 0: deadline in 7 days, 80% of the gap remaining
        let goals = vec![
            goal(0.4, 3.6, 0.5, Some(7), now),
            goal(0.4, 3.6, 0.5, None, now),
        ];
        let mut allocator = CurriculumAllocator::new(AllocatorConfig::default(), 13);
        let outcome = allocator
            .allocate(&goals, &[], 30.0, SelectionPreference::DeadlineFocused, now)
            .unwrap();
        assert!(
            outcome.selected.allocation[0] >= 0.6,
            "urgent goal got {}",
            outcome.selected.allocation[0]
        );
    }

    #[test]
    fn test_balanced_splits_evenly_for_twin_goals() {
        let now = Utc::now();
        let goals = vec![
            goal(0.4, 3.6, 0.5, Some(7), now),
            goal(0.4, 3.6, 0.5, None, now),
        ];
        let mut allocator = CurriculumAllocator::new(AllocatorConfig::default(), 13);
        let outcome = allocator
            .allocate(&goals, &[], 30.0, SelectionPreference::Balanced, now)
            .unwrap();
        assert!((outcome.selected.allocation[0] - 0.5).abs() <= 0.1);
        assert!((outcome.selected.allocation[1] - 0.5).abs() <= 0.1);
    }

    #[test]
    fn test_synergy_focus_rewards_shared_coverage() {
        let now = Utc::now();
        let goals = vec![
            goal(0.0, 2.0, 1.0, None, now),
            goal(0.0, 2.0, 1.0, None, now),
        ];
        let shared = vec![SharedObject {
            object_id: Uuid::new_v4(),
            benefiting_goals: vec![
                GoalBenefit {
                    goal_id: goals[0].goal_id,
                    relevance: 0.9,
                },
                GoalBenefit {
                    goal_id: goals[1].goal_id,
                    relevance: 0.8,
                },
            ],
        }];
        let mut allocator = CurriculumAllocator::new(AllocatorConfig::default(), 5);
        let with_shared = allocator
            .allocate(&goals, &shared, 30.0, SelectionPreference::SynergyFocused, now)
            .unwrap();
        assert!(with_shared.selected.efficiency > 0.0);
    }

    #[test]
    fn test_shared_priority_boost_curve() {
        assert_eq!(shared_priority_boost(1), 1.0);
        let two = shared_priority_boost(2);
        let four = shared_priority_boost(4);
        assert!(four > two);
        // ln(1 + 4) / ln 5 = 1: four-way sharing is the neutral point
        assert!((four - 1.0).abs() < 1e-9);
        assert!(shared_priority_boost(9) > 1.0);
    }

    #[test]
    fn test_empty_goals_rejected() {
        let mut allocator = CurriculumAllocator::new(AllocatorConfig::default(), 1);
        assert!(allocator
            .allocate(&[], &[], 30.0, SelectionPreference::Balanced, Utc::now())
            .is_err());
    }

    #[test]
    fn test_single_goal_takes_everything() {
        let now = Utc::now();
        let goals = vec![goal(0.0, 2.0, 1.0, None, now)];
        let mut allocator = CurriculumAllocator::new(AllocatorConfig::default(), 3);
        let outcome = allocator
            .allocate(&goals, &[], 30.0, SelectionPreference::Balanced, now)
            .unwrap();
        assert_eq!(outcome.selected.allocation, vec![1.0]);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let now = Utc::now();
        let goals = vec![
            goal(0.0, 2.0, 1.0, Some(10), now),
            goal(0.5, 2.5, 1.0, None, now),
        ];
        let run = |seed| {
            CurriculumAllocator::new(AllocatorConfig::default(), seed)
                .allocate(&goals, &[], 30.0, SelectionPreference::ProgressFocused, now)
                .unwrap()
                .selected
                .allocation
        };
        assert_eq!(run(42), run(42));
    }
}
