//! Priority scoring and queue building
//!
//! The FRE composite: frequency, relational density and engagement,
//! divided by a cost model and scaled by urgency. Weights shift with the
//! learner's level, a detected bottleneck boosts matching objects, and
//! the queue builder turns the ranked pool into an ordered session of due
//! reviews topped up with new items under the batch-variety cap.

use crate::bottleneck::BottleneckReport;
use crate::features;
use chrono::{DateTime, Utc};
use logos_core::entities::{Goal, LanguageObject, MasteryState, UserProfile};
use logos_core::numerics::sigmoid;
use logos_core::transfer::{self, L1Family, TransferDimension};
use logos_types::{
    CardState, LinguisticComponent, LogosError, Result, SessionConfig, TaskType,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Cost floor: no object becomes free to practice
const COST_FLOOR: f64 = 0.1;

/// FRE weights; the three components are renormalized after level
/// adjustment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriorityWeights {
    pub frequency: f64,
    pub relational: f64,
    pub engagement: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            frequency: 0.4,
            relational: 0.3,
            engagement: 0.3,
        }
    }
}

impl PriorityWeights {
    /// Level-dependent adjustment: novices lean on frequency, advanced
    /// learners on engagement
    fn adjusted_for(self, global_theta: f64) -> Self {
        let mut weights = self;
        if global_theta < -1.0 {
            weights.frequency += 0.2;
            weights.engagement -= 0.1;
        } else if global_theta > 1.0 {
            weights.engagement += 0.2;
            weights.frequency -= 0.1;
        }
        let sum = weights.frequency + weights.relational + weights.engagement;
        Self {
            frequency: (weights.frequency / sum).max(0.0),
            relational: (weights.relational / sum).max(0.0),
            engagement: (weights.engagement / sum).max(0.0),
        }
    }
}

/// Priority engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityConfig {
    pub weights: PriorityWeights,
    /// Multiplier for objects in the primary bottleneck component
    pub bottleneck_boost: f64,
}

impl PriorityConfig {
    pub fn new(weights: PriorityWeights, bottleneck_boost: f64) -> Result<Self> {
        if !(1.0..=2.0).contains(&bottleneck_boost) {
            return Err(LogosError::InvalidInput(format!(
                "bottleneck boost {} outside [1, 2]",
                bottleneck_boost
            )));
        }
        Ok(Self {
            weights,
            bottleneck_boost,
        })
    }
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            bottleneck_boost: 1.5,
        }
    }
}

/// Everything the scorer needs besides the object itself
#[derive(Debug, Clone)]
pub struct PriorityContext<'a> {
    pub user: &'a UserProfile,
    pub goal: &'a Goal,
    pub bottleneck: Option<LinguisticComponent>,
    /// Knowledge strength from encounter aggregation, when available
    pub knowledge_strength: f64,
    pub now: DateTime<Utc>,
}

/// FRE priority scorer
#[derive(Debug, Clone, Default)]
pub struct PriorityEngine {
    config: PriorityConfig,
}

impl PriorityEngine {
    pub fn new(config: PriorityConfig) -> Self {
        Self { config }
    }

    /// Score one object: (wF*F + wR*R + wE*E) / cost * urgency, with the
    /// bottleneck boost applied last
    pub fn score(
        &self,
        object: &LanguageObject,
        mastery: &MasteryState,
        context: &PriorityContext<'_>,
    ) -> f64 {
        let weights = self
            .config
            .weights
            .adjusted_for(context.user.global_theta.theta);

        let frequency = object.z.frequency;
        let relational = object.z.relational;
        let engagement = object.domain_relevance(context.goal.domain)
            * (1.0 - context.knowledge_strength.clamp(0.0, 1.0));

        let benefit = weights.frequency * frequency
            + weights.relational * relational
            + weights.engagement * engagement;

        let cost = self.cost(object, mastery, context);
        let urgency = self.urgency(mastery, context);

        let mut score = benefit / cost * urgency;
        if context.bottleneck == Some(object.component()) {
            score *= self.config.bottleneck_boost;
        }
        score
    }

    /// Cost = 1 + base_irt_cost - transfer_gain + exposure_penalty -
    /// recency_bonus, floored at 0.1
    fn cost(
        &self,
        object: &LanguageObject,
        mastery: &MasteryState,
        context: &PriorityContext<'_>,
    ) -> f64 {
        // Items far above the learner's ability cost more to practice
        let base_irt_cost = sigmoid(object.params.b - context.user.global_theta.theta);

        let family = L1Family::from_language_tag(&context.user.native_language);
        let dimension = transfer_dimension_for(object.component());
        let transfer_value = transfer::effective_transfer(family, dimension, context.goal.domain)
            + transfer::cognate_boost(family, &object.content);
        // cost_adjustment is negative for positive transfer
        let transfer_term = transfer::cost_adjustment(transfer_value.clamp(-1.0, 1.0));

        let exposure_penalty = (mastery.exposure_count as f64 / 40.0).min(0.5);

        let recency_bonus = match mastery.card.last_review {
            Some(last) => {
                let days = ((context.now - last).num_seconds() as f64 / 86_400.0).max(0.0);
                0.25 * (-days / 7.0).exp()
            }
            None => 0.0,
        };

        (1.0 + base_irt_cost + transfer_term + exposure_penalty - recency_bonus).max(COST_FLOOR)
    }

    /// Urgency grows with the remaining stage gap and as the goal
    /// deadline approaches; monotone non-decreasing as days shrink
    fn urgency(&self, mastery: &MasteryState, context: &PriorityContext<'_>) -> f64 {
        let stage_gap = (4 - mastery.stage.index()) as f64 / 4.0;
        let deadline_weight = match context.goal.deadline {
            Some(deadline) => {
                let days_left =
                    ((deadline - context.now).num_seconds() as f64 / 86_400.0).max(0.0);
                1.0 + 1.0 / (1.0 + days_left / 7.0)
            }
            None => 1.0,
        };
        (1.0 + 0.5 * stage_gap) * deadline_weight
    }
}

fn transfer_dimension_for(component: LinguisticComponent) -> TransferDimension {
    match component {
        LinguisticComponent::Phonology => TransferDimension::Phonological,
        LinguisticComponent::Morphology => TransferDimension::Morphological,
        LinguisticComponent::Lexis => TransferDimension::Lexical,
        LinguisticComponent::Syntax => TransferDimension::Syntactic,
        LinguisticComponent::Pragmatics => TransferDimension::Pragmatic,
    }
}

/// One planned slot in a built session queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub object_id: Uuid,
    pub task_type: TaskType,
    pub priority: f64,
    /// Review due time for review items, None for new items
    pub due: Option<DateTime<Utc>>,
}

/// Build an ordered practice queue for one goal.
///
/// Due reviews come first (priority descending, older due time breaking
/// ties), then the highest-priority new items top the queue up to the
/// session size, capped by the configured new-item ratio. The batch
/// variety pass bounds consecutive same-type tasks. The output never
/// repeats an object and never exceeds `session_size`.
pub fn build_queue(
    objects: &[LanguageObject],
    masteries: &HashMap<Uuid, MasteryState>,
    engine: &PriorityEngine,
    context: &PriorityContext<'_>,
    session: &SessionConfig,
    report: Option<&BottleneckReport>,
) -> Vec<QueueItem> {
    let mut ctx = context.clone();
    if let Some(report) = report {
        ctx.bottleneck = Some(report.primary);
    }

    let mut scored: Vec<(&LanguageObject, &MasteryState, f64)> = Vec::new();
    for object in objects {
        if object.goal_id != ctx.goal.id {
            continue;
        }
        let Some(mastery) = masteries.get(&object.id) else {
            continue;
        };
        scored.push((object, mastery, engine.score(object, mastery, &ctx)));
    }

    let mut reviews: Vec<&(&LanguageObject, &MasteryState, f64)> = scored
        .iter()
        .filter(|(_, mastery, _)| {
            matches!(mastery.card.next_review, Some(due) if due <= context.now)
        })
        .collect();
    reviews.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.card.next_review.cmp(&b.1.card.next_review))
    });

    let mut fresh: Vec<&(&LanguageObject, &MasteryState, f64)> = scored
        .iter()
        .filter(|(_, mastery, _)| mastery.card.state == CardState::New)
        .collect();
    fresh.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let new_quota = ((session.session_size as f64) * session.new_item_ratio).ceil() as usize;

    let mut picked: Vec<(&LanguageObject, &MasteryState, f64, Option<DateTime<Utc>>)> = Vec::new();
    let mut seen: std::collections::HashSet<Uuid> = std::collections::HashSet::new();
    for &(object, mastery, score) in reviews {
        if picked.len() >= session.session_size {
            break;
        }
        if seen.insert(object.id) {
            picked.push((object, mastery, score, mastery.card.next_review));
        }
    }
    let mut new_taken = 0usize;
    for &(object, mastery, score) in fresh {
        if picked.len() >= session.session_size || new_taken >= new_quota {
            break;
        }
        if seen.insert(object.id) {
            picked.push((object, mastery, score, None));
            new_taken += 1;
        }
    }

    // Batch variety over the planned task types
    let ranked_per_item: Vec<Vec<(TaskType, f64)>> = picked
        .iter()
        .map(|(object, mastery, _, _)| features::rank_tasks(&object.z, mastery.stage))
        .collect();
    let task_types = features::enforce_variety(&ranked_per_item, session.max_per_type);

    picked
        .into_iter()
        .zip(task_types)
        .map(|((object, _, score, due), task_type)| QueueItem {
            object_id: object.id,
            task_type,
            priority: score,
            due,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use logos_core::entities::ZVector;
    use logos_core::fsrs::FsrsCard;
    use logos_core::irt::ItemParams;
    use logos_types::{Domain, MasteryStage, Modality, ObjectType};
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    fn test_goal(user_id: Uuid, deadline_days: Option<i64>) -> Goal {
        let mut modalities = BTreeSet::new();
        modalities.insert(Modality::Reading);
        Goal::new(
            user_id,
            Domain::Medical,
            modalities,
            "case reports",
            "board exam",
            deadline_days.map(|d| Utc::now() + Duration::days(d)),
        )
        .unwrap()
    }

    fn test_object(goal_id: Uuid, content: &str, z: ZVector) -> LanguageObject {
        let mut distribution = BTreeMap::new();
        distribution.insert(Domain::Medical, 1.0);
        LanguageObject::new(
            goal_id,
            ObjectType::Lexical,
            content,
            z,
            ItemParams::new(1.0, 0.0, 0.0).unwrap(),
            distribution,
        )
        .unwrap()
    }

    fn context<'a>(user: &'a UserProfile, goal: &'a Goal) -> PriorityContext<'a> {
        PriorityContext {
            user,
            goal,
            bottleneck: None,
            knowledge_strength: 0.0,
            now: Utc::now(),
        }
    }

    #[test]
    fn test_higher_frequency_scores_higher() {
        let user = UserProfile::new("es", "en");
        let goal = test_goal(user.id, None);
        let engine = PriorityEngine::default();
        let frequent = test_object(goal.id, "patient", ZVector::new(0.9, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1));
        let rare = test_object(goal.id, "patient", ZVector::new(0.1, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1));
        let mastery_a = MasteryState::new(frequent.id);
        let mastery_b = MasteryState::new(rare.id);
        let ctx = context(&user, &goal);
        assert!(engine.score(&frequent, &mastery_a, &ctx) > engine.score(&rare, &mastery_b, &ctx));
    }

    #[test]
    fn test_bottleneck_boost_applies_to_matching_component() {
        let user = UserProfile::new("ja", "en");
        let goal = test_goal(user.id, None);
        let engine = PriorityEngine::default();
        let object = test_object(goal.id, "arrhythmia", ZVector::new(0.5, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1));
        let mastery = MasteryState::new(object.id);

        let plain = context(&user, &goal);
        let mut boosted = context(&user, &goal);
        boosted.bottleneck = Some(LinguisticComponent::Lexis);
        let base = engine.score(&object, &mastery, &plain);
        let with_boost = engine.score(&object, &mastery, &boosted);
        assert!((with_boost / base - 1.5).abs() < 1e-9);

        let mut other = context(&user, &goal);
        other.bottleneck = Some(LinguisticComponent::Syntax);
        assert!((engine.score(&object, &mastery, &other) - base).abs() < 1e-12);
    }

    #[test]
    fn test_deadline_raises_urgency_monotonically() {
        let user = UserProfile::new("de", "en");
        let engine = PriorityEngine::default();
        let far_goal = test_goal(user.id, Some(60));
        let near_goal = test_goal(user.id, Some(3));

        let z = ZVector::new(0.5, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1);
        let far_object = test_object(far_goal.id, "deposition", z);
        let near_object = test_object(near_goal.id, "deposition", z);
        let far_score = engine.score(
            &far_object,
            &MasteryState::new(far_object.id),
            &context(&user, &far_goal),
        );
        let near_score = engine.score(
            &near_object,
            &MasteryState::new(near_object.id),
            &context(&user, &near_goal),
        );
        assert!(near_score > far_score);
    }

    #[test]
    fn test_positive_transfer_lowers_cost() {
        // Romance L1 with a Latinate medical term: strong transfer
        let romance = UserProfile::new("es", "en");
        let japonic = UserProfile::new("ja", "en");
        let engine = PriorityEngine::default();
        let z = ZVector::new(0.5, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1);

        let goal_r = test_goal(romance.id, None);
        let goal_j = test_goal(japonic.id, None);
        let object_r = test_object(goal_r.id, "inflammation", z);
        let object_j = test_object(goal_j.id, "inflammation", z);
        let score_r = engine.score(
            &object_r,
            &MasteryState::new(object_r.id),
            &context(&romance, &goal_r),
        );
        let score_j = engine.score(
            &object_j,
            &MasteryState::new(object_j.id),
            &context(&japonic, &goal_j),
        );
        assert!(score_r > score_j);
    }

    #[test]
    fn test_invalid_boost_rejected() {
        assert!(PriorityConfig::new(PriorityWeights::default(), 2.5).is_err());
        assert!(PriorityConfig::new(PriorityWeights::default(), 0.5).is_err());
        assert!(PriorityConfig::new(PriorityWeights::default(), 1.0).is_ok());
    }

    #[test]
    fn test_queue_reviews_before_new() {
        let user = UserProfile::new("es", "en");
        let goal = test_goal(user.id, None);
        let engine = PriorityEngine::default();
        let now = Utc::now();

        let mut objects = Vec::new();
        let mut masteries = HashMap::new();
        // Three due reviews
        for i in 0..3 {
            let object = test_object(
                goal.id,
                &format!("review-{}", i),
                ZVector::new(0.5, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1),
            );
            let mut mastery = MasteryState::new(object.id);
            mastery.stage = MasteryStage::Recall;
            mastery.card = FsrsCard {
                stability: 5.0,
                difficulty: 5.0,
                state: CardState::Review,
                last_review: Some(now - Duration::days(6)),
                next_review: Some(now - Duration::days(i)),
                ..FsrsCard::new()
            };
            masteries.insert(object.id, mastery);
            objects.push(object);
        }
        // Five new items
        for i in 0..5 {
            let object = test_object(
                goal.id,
                &format!("new-{}", i),
                ZVector::new(0.6, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1),
            );
            masteries.insert(object.id, MasteryState::new(object.id));
            objects.push(object);
        }

        let session = SessionConfig {
            session_size: 6,
            new_item_ratio: 0.5,
            ..SessionConfig::default()
        };
        let queue = build_queue(
            &objects,
            &masteries,
            &engine,
            &context(&user, &goal),
            &session,
            None,
        );

        assert!(queue.len() <= 6);
        // Reviews lead the queue
        assert!(queue[0].due.is_some());
        assert!(queue[1].due.is_some());
        assert!(queue[2].due.is_some());
        // No duplicates
        let mut ids: Vec<Uuid> = queue.iter().map(|item| item.object_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), queue.len());
        // New-item quota respected: ceil(6 * 0.5) = 3
        assert!(queue.iter().filter(|item| item.due.is_none()).count() <= 3);
    }

    #[test]
    fn test_queue_respects_goal_ownership() {
        let user = UserProfile::new("es", "en");
        let goal = test_goal(user.id, None);
        let other_goal = test_goal(user.id, None);
        let engine = PriorityEngine::default();

        let mine = test_object(goal.id, "mine", ZVector::new(0.9, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1));
        let foreign = test_object(
            other_goal.id,
            "foreign",
            ZVector::new(0.9, 0.3, 0.4, 0.1, 0.2, 0.1, 0.1),
        );
        let mut masteries = HashMap::new();
        masteries.insert(mine.id, MasteryState::new(mine.id));
        masteries.insert(foreign.id, MasteryState::new(foreign.id));

        let queue = build_queue(
            &[mine.clone(), foreign.clone()],
            &masteries,
            &engine,
            &context(&user, &goal),
            &SessionConfig::default(),
            None,
        );
        assert!(queue.iter().all(|item| item.object_id == mine.id));
    }
}
