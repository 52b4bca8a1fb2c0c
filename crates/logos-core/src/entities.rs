//! Entity model of the learning core
//!
//! The persistent shapes the engines operate on: user ability profiles,
//! goals, language objects with their z(w) vectors, collocations, mastery
//! state, sessions, responses, encounters and the multi-goal curriculum
//! layer. Constructors validate the documented invariants so that
//! out-of-range values never reach the engines.

use crate::fsrs::FsrsCard;
use crate::irt::ItemParams;
use chrono::{DateTime, Utc};
use logos_types::{
    clamp_theta, Domain, InteractionCategory, LinguisticComponent, LogosError, MasteryStage,
    Modality, ObjectType, Result, SessionMode, TaskFormat, TaskModality, TaskType,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Tolerance for a scaffolding gap reported as negative: assisted
/// accuracy this far below cue-free accuracy is noise, anything beyond
/// is flagged
pub const SCAFFOLDING_GAP_EPSILON: f64 = 0.05;

/// One ability dimension: a logit-scale estimate with its standard error
/// and the number of responses that shaped it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityDimension {
    pub theta: f64,
    pub se: f64,
    pub response_count: u32,
}

impl AbilityDimension {
    pub fn new() -> Self {
        Self {
            theta: 0.0,
            se: 1.0,
            response_count: 0,
        }
    }

    /// Fold in a fresh estimate, clamping theta and keeping SE
    /// non-negative
    pub fn observe(&mut self, theta: f64, se: f64) {
        self.theta = clamp_theta(theta);
        self.se = if se.is_finite() { se.max(0.0) } else { self.se };
        self.response_count = self.response_count.saturating_add(1);
    }
}

impl Default for AbilityDimension {
    fn default() -> Self {
        Self::new()
    }
}

/// A learner: language pair plus the theta profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    /// BCP 47 tag of the native language
    pub native_language: String,
    /// BCP 47 tag of the target language
    pub target_language: String,
    pub global_theta: AbilityDimension,
    pub component_theta: BTreeMap<LinguisticComponent, AbilityDimension>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(native_language: impl Into<String>, target_language: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut component_theta = BTreeMap::new();
        for component in logos_types::CASCADE_ORDER {
            component_theta.insert(component, AbilityDimension::new());
        }
        Self {
            id: Uuid::new_v4(),
            native_language: native_language.into(),
            target_language: target_language.into(),
            global_theta: AbilityDimension::new(),
            component_theta,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn component(&self, component: LinguisticComponent) -> AbilityDimension {
        self.component_theta
            .get(&component)
            .copied()
            .unwrap_or_default()
    }
}

/// A learning goal owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub domain: Domain,
    pub modalities: BTreeSet<Modality>,
    pub genre: String,
    pub purpose: String,
    pub benchmark: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// User-assigned weight in [0, 1], default 1
    pub weight: f64,
    /// Progress toward the goal in [0, 1]
    pub progress: f64,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(
        user_id: Uuid,
        domain: Domain,
        modalities: BTreeSet<Modality>,
        genre: impl Into<String>,
        purpose: impl Into<String>,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if modalities.is_empty() {
            return Err(LogosError::InvalidInput(
                "goal needs at least one modality".to_string(),
            ));
        }
        let now = Utc::now();
        if let Some(deadline) = deadline {
            if deadline <= now {
                return Err(LogosError::InvalidInput(
                    "goal deadline must be in the future".to_string(),
                ));
            }
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            domain,
            modalities,
            genre: genre.into(),
            purpose: purpose.into(),
            benchmark: None,
            deadline,
            weight: 1.0,
            progress: 0.0,
            created_at: now,
        })
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }
}

/// Index of a z(w) component, in persistence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZComponent {
    Frequency,
    Relational,
    Difficulty,
    Morphological,
    Phonological,
    Pragmatic,
    Syntactic,
}

impl ZComponent {
    pub const ORDER: [ZComponent; 7] = [
        ZComponent::Frequency,
        ZComponent::Relational,
        ZComponent::Difficulty,
        ZComponent::Morphological,
        ZComponent::Phonological,
        ZComponent::Pragmatic,
        ZComponent::Syntactic,
    ];
}

/// The seven-component feature vector of a language object, persisted as
/// seven consecutive floats in F, R, D, M, P, PRAG, SYNT order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 7]", from = "[f64; 7]")]
pub struct ZVector {
    pub frequency: f64,
    pub relational: f64,
    pub difficulty: f64,
    pub morphological: f64,
    pub phonological: f64,
    pub pragmatic: f64,
    pub syntactic: f64,
}

impl ZVector {
    /// Build a vector, clamping every component into [0, 1]
    pub fn new(
        frequency: f64,
        relational: f64,
        difficulty: f64,
        morphological: f64,
        phonological: f64,
        pragmatic: f64,
        syntactic: f64,
    ) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            frequency: clamp(frequency),
            relational: clamp(relational),
            difficulty: clamp(difficulty),
            morphological: clamp(morphological),
            phonological: clamp(phonological),
            pragmatic: clamp(pragmatic),
            syntactic: clamp(syntactic),
        }
    }

    pub fn as_array(&self) -> [f64; 7] {
        [
            self.frequency,
            self.relational,
            self.difficulty,
            self.morphological,
            self.phonological,
            self.pragmatic,
            self.syntactic,
        ]
    }

    pub fn component(&self, component: ZComponent) -> f64 {
        match component {
            ZComponent::Frequency => self.frequency,
            ZComponent::Relational => self.relational,
            ZComponent::Difficulty => self.difficulty,
            ZComponent::Morphological => self.morphological,
            ZComponent::Phonological => self.phonological,
            ZComponent::Pragmatic => self.pragmatic,
            ZComponent::Syntactic => self.syntactic,
        }
    }

    /// Component with the largest value; persistence order breaks ties
    pub fn dominant(&self) -> ZComponent {
        let mut best = ZComponent::Frequency;
        let mut best_value = f64::NEG_INFINITY;
        for component in ZComponent::ORDER {
            let value = self.component(component);
            if value > best_value {
                best = component;
                best_value = value;
            }
        }
        best
    }
}

impl From<ZVector> for [f64; 7] {
    fn from(z: ZVector) -> Self {
        z.as_array()
    }
}

impl From<[f64; 7]> for ZVector {
    fn from(a: [f64; 7]) -> Self {
        ZVector::new(a[0], a[1], a[2], a[3], a[4], a[5], a[6])
    }
}

/// The atom of learning: one token or pattern owned by one goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageObject {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub object_type: ObjectType,
    pub content: String,
    pub z: ZVector,
    pub params: ItemParams,
    /// Cached priority score; recomputed after every affecting update
    pub priority: f64,
    /// Relevance per professional domain, approximately summing to 1
    pub domain_distribution: BTreeMap<Domain, f64>,
}

impl LanguageObject {
    pub fn new(
        goal_id: Uuid,
        object_type: ObjectType,
        content: impl Into<String>,
        z: ZVector,
        params: ItemParams,
        domain_distribution: BTreeMap<Domain, f64>,
    ) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(LogosError::InvalidInput(
                "language object content must be non-empty".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            goal_id,
            object_type,
            content,
            z,
            params,
            priority: 0.0,
            domain_distribution: normalize_distribution(domain_distribution),
        })
    }

    pub fn component(&self) -> LinguisticComponent {
        self.object_type.component()
    }

    /// Relevance of this object to a domain, zero when unlisted
    pub fn domain_relevance(&self, domain: Domain) -> f64 {
        self.domain_distribution.get(&domain).copied().unwrap_or(0.0)
    }
}

fn normalize_distribution(mut distribution: BTreeMap<Domain, f64>) -> BTreeMap<Domain, f64> {
    distribution.retain(|_, v| v.is_finite() && *v > 0.0);
    let sum: f64 = distribution.values().sum();
    if sum <= 0.0 {
        let mut fallback = BTreeMap::new();
        fallback.insert(Domain::General, 1.0);
        return fallback;
    }
    for value in distribution.values_mut() {
        *value /= sum;
    }
    distribution
}

/// Undirected collocation between two distinct objects of one goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collocation {
    pub goal_id: Uuid,
    /// Canonically ordered pair: `first` < `second`
    pub first: Uuid,
    pub second: Uuid,
    pub pmi: f64,
    pub npmi: f64,
    pub cooccurrence: u32,
    pub significance: f64,
}

impl Collocation {
    pub fn new(
        goal_id: Uuid,
        a: Uuid,
        b: Uuid,
        pmi: f64,
        npmi: f64,
        cooccurrence: u32,
        significance: f64,
    ) -> Result<Self> {
        if a == b {
            return Err(LogosError::InvalidInput(
                "collocation endpoints must be distinct".to_string(),
            ));
        }
        if cooccurrence == 0 {
            return Err(LogosError::InvalidInput(
                "collocation needs at least one co-occurrence".to_string(),
            ));
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self {
            goal_id,
            first,
            second,
            pmi,
            npmi: npmi.clamp(-1.0, 1.0),
            cooccurrence,
            significance: significance.clamp(0.0, 1.0),
        })
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint
    pub fn other(&self, id: &Uuid) -> Option<Uuid> {
        if *id == self.first {
            Some(self.second)
        } else if *id == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Mastery state of one language object: stage, FSRS card, accuracies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryState {
    pub object_id: Uuid,
    pub stage: MasteryStage,
    pub card: FsrsCard,
    pub cue_free_accuracy: f64,
    pub cue_assisted_accuracy: f64,
    cue_free_count: u32,
    cue_assisted_count: u32,
    pub exposure_count: u32,
    /// Consecutive Again ratings, reset by anything better
    pub again_streak: u32,
    pub priority: f64,
    /// Optimistic-concurrency token for read-verify-write updates
    pub version: u64,
}

impl MasteryState {
    pub fn new(object_id: Uuid) -> Self {
        Self {
            object_id,
            stage: MasteryStage::Unknown,
            card: FsrsCard::new(),
            cue_free_accuracy: 0.0,
            cue_assisted_accuracy: 0.0,
            cue_free_count: 0,
            cue_assisted_count: 0,
            exposure_count: 0,
            again_streak: 0,
            priority: 0.0,
            version: 0,
        }
    }

    /// Running-average accuracy update for one response
    pub fn record_accuracy(&mut self, cued: bool, correct: bool) {
        let outcome = if correct { 1.0 } else { 0.0 };
        if cued {
            self.cue_assisted_count = self.cue_assisted_count.saturating_add(1);
            let n = self.cue_assisted_count as f64;
            self.cue_assisted_accuracy += (outcome - self.cue_assisted_accuracy) / n;
        } else {
            self.cue_free_count = self.cue_free_count.saturating_add(1);
            let n = self.cue_free_count as f64;
            self.cue_free_accuracy += (outcome - self.cue_free_accuracy) / n;
        }
        self.exposure_count = self.exposure_count.saturating_add(1);
    }

    /// cue_assisted - cue_free; positive when scaffolding still helps
    pub fn scaffolding_gap(&self) -> f64 {
        self.cue_assisted_accuracy - self.cue_free_accuracy
    }

    /// A gap below -epsilon signals inconsistent measurements; tolerated
    /// but surfaced to the caller for logging
    pub fn gap_consistent(&self) -> bool {
        self.scaffolding_gap() >= -SCAFFOLDING_GAP_EPSILON
    }
}

/// Append-only audit record of one stage change. Field names are the
/// stable persisted schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransitionRecord {
    pub id: Uuid,
    pub object_id: Uuid,
    pub from_stage: MasteryStage,
    pub to_stage: MasteryStage,
    pub trigger: String,
    pub cue_free: f64,
    pub cue_assisted: f64,
    pub stability: f64,
    pub exposure: u32,
    pub gap: f64,
    pub occurred_at: DateTime<Utc>,
}

impl StageTransitionRecord {
    pub fn from_mastery(
        mastery: &MasteryState,
        to_stage: MasteryStage,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            object_id: mastery.object_id,
            from_stage: mastery.stage,
            to_stage,
            trigger: trigger.into(),
            cue_free: mastery.cue_free_accuracy,
            cue_assisted: mastery.cue_assisted_accuracy,
            stability: mastery.card.stability,
            exposure: mastery.exposure_count,
            gap: mastery.scaffolding_gap(),
            occurred_at: Utc::now(),
        }
    }
}

/// Snapshot of the theta profile taken when a session closes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThetaSnapshot {
    pub global_theta: AbilityDimension,
    pub component_theta: BTreeMap<LinguisticComponent, AbilityDimension>,
    pub taken_at: DateTime<Utc>,
}

impl ThetaSnapshot {
    pub fn of(profile: &UserProfile) -> Self {
        Self {
            global_theta: profile.global_theta,
            component_theta: profile.component_theta.clone(),
            taken_at: Utc::now(),
        }
    }
}

/// One practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub mode: SessionMode,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub items_practiced: u32,
    pub stage_transitions: u32,
    pub fluency_tasks: u32,
    pub versatility_tasks: u32,
    pub response_count: u32,
    pub correct_count: u32,
    pub theta_snapshot: Option<ThetaSnapshot>,
}

impl SessionRecord {
    pub fn new(user_id: Uuid, goal_id: Uuid, mode: SessionMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            goal_id,
            mode,
            started_at: Utc::now(),
            ended_at: None,
            items_practiced: 0,
            stage_transitions: 0,
            fluency_tasks: 0,
            versatility_tasks: 0,
            response_count: 0,
            correct_count: 0,
            theta_snapshot: None,
        }
    }

    /// Close the session with a theta snapshot; closing twice keeps the
    /// first end time
    pub fn close(&mut self, snapshot: ThetaSnapshot) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
            self.theta_snapshot = Some(snapshot);
        }
    }
}

/// One scored response, append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub object_id: Uuid,
    pub task_type: TaskType,
    pub task_format: TaskFormat,
    pub modality: TaskModality,
    pub correct: bool,
    pub response_time_ms: u32,
    pub cue_level: logos_types::CueLevel,
    pub response_content: Option<String>,
    pub expected_content: Option<String>,
    /// Contribution to the ability estimate in logit units, when scored
    pub theta_contribution: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

impl ResponseRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: Uuid,
        object_id: Uuid,
        task_type: TaskType,
        task_format: TaskFormat,
        modality: TaskModality,
        correct: bool,
        response_time_ms: u32,
        cue_level: logos_types::CueLevel,
    ) -> Result<Self> {
        if response_time_ms == 0 {
            return Err(LogosError::InvalidInput(
                "response time must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            session_id,
            object_id,
            task_type,
            task_format,
            modality,
            correct,
            response_time_ms,
            cue_level,
            response_content: None,
            expected_content: None,
            theta_contribution: None,
            occurred_at: Utc::now(),
        })
    }
}

/// One recorded meeting between a learner and an object, with context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEncounter {
    pub id: Uuid,
    pub user_id: Uuid,
    pub object_id: Uuid,
    pub category: InteractionCategory,
    pub modality: Modality,
    pub domain: Domain,
    pub correct: bool,
    pub response_time_ms: u32,
    pub theta_at_encounter: f64,
    pub difficulty_at_encounter: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregated encounter statistics per (user, object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipStats {
    pub user_id: Uuid,
    pub object_id: Uuid,
    pub encounters: u32,
    pub counts_by_category: BTreeMap<InteractionCategory, u32>,
    pub success_by_category: BTreeMap<InteractionCategory, u32>,
    pub counts_by_modality: BTreeMap<Modality, u32>,
    pub success_by_modality: BTreeMap<Modality, u32>,
    pub domain_exposure: BTreeMap<Domain, u32>,
    /// Running mean of response times in milliseconds
    pub avg_response_ms: f64,
    pub last_encounter: Option<DateTime<Utc>>,
    // Derived metrics, refreshed by the encounter aggregator
    pub interpretation_ratio: f64,
    pub modality_balance: f64,
    pub retrieval_fluency: f64,
    pub knowledge_strength: f64,
    pub learning_cost: f64,
}

impl RelationshipStats {
    pub fn new(user_id: Uuid, object_id: Uuid) -> Self {
        Self {
            user_id,
            object_id,
            encounters: 0,
            counts_by_category: BTreeMap::new(),
            success_by_category: BTreeMap::new(),
            counts_by_modality: BTreeMap::new(),
            success_by_modality: BTreeMap::new(),
            domain_exposure: BTreeMap::new(),
            avg_response_ms: 0.0,
            last_encounter: None,
            interpretation_ratio: 0.0,
            modality_balance: 0.0,
            retrieval_fluency: 0.0,
            knowledge_strength: 0.0,
            learning_cost: 1.0,
        }
    }

    /// Overall success rate across all recorded encounters
    pub fn success_rate(&self) -> f64 {
        if self.encounters == 0 {
            return 0.0;
        }
        let successes: u32 = self.success_by_category.values().sum();
        successes as f64 / self.encounters as f64
    }
}

/// Orthographic layer of the G2P ability profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum G2PLayer {
    Alphabetic,
    Syllable,
    Word,
}

/// Multidimensional phonological ability profile: decoding skill per
/// orthographic layer and per modality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct G2PThetaProfile {
    pub user_id: Uuid,
    pub layers: BTreeMap<G2PLayer, AbilityDimension>,
    pub modalities: BTreeMap<Modality, AbilityDimension>,
}

impl G2PThetaProfile {
    pub fn new(user_id: Uuid) -> Self {
        let mut layers = BTreeMap::new();
        for layer in [G2PLayer::Alphabetic, G2PLayer::Syllable, G2PLayer::Word] {
            layers.insert(layer, AbilityDimension::new());
        }
        let mut modalities = BTreeMap::new();
        for modality in Modality::ALL {
            modalities.insert(modality, AbilityDimension::new());
        }
        Self {
            user_id,
            layers,
            modalities,
        }
    }

    pub fn observe(&mut self, layer: G2PLayer, modality: Modality, theta: f64, se: f64) {
        self.layers.entry(layer).or_default().observe(theta, se);
        self.modalities
            .entry(modality)
            .or_default()
            .observe(theta, se);
    }
}

/// A goal as seen by the multi-curriculum allocator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumGoal {
    pub goal_id: Uuid,
    pub current_theta: f64,
    pub target_theta: f64,
    pub weight: f64,
    pub deadline: Option<DateTime<Utc>>,
    pub modalities: BTreeSet<Modality>,
}

impl CurriculumGoal {
    /// Remaining ability gap in logits, never negative
    pub fn gap(&self) -> f64 {
        (self.target_theta - self.current_theta).max(0.0)
    }
}

/// Relevance of a shared object to one benefiting goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalBenefit {
    pub goal_id: Uuid,
    pub relevance: f64,
}

/// An object that advances more than one active goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedObject {
    pub object_id: Uuid,
    pub benefiting_goals: Vec<GoalBenefit>,
}

impl SharedObject {
    pub fn goal_count(&self) -> usize {
        self.benefiting_goals.len()
    }
}

/// One candidate time allocation across goals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoSolution {
    /// Per-goal share of session time, summing to 1
    pub allocation: Vec<f64>,
    /// Expected per-goal progress under this allocation
    pub expected_progress: Vec<f64>,
    pub efficiency: f64,
    pub deadline_risk: f64,
    pub dominated: bool,
}

/// A task request sent to the content oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub object_id: Uuid,
    pub task_type: TaskType,
    pub format: TaskFormat,
    pub modality: TaskModality,
    pub cue_level: logos_types::CueLevel,
    pub target_difficulty: f64,
}

/// Task content, whether oracle-generated or template-derived
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContent {
    pub prompt: String,
    pub options: Vec<String>,
    pub distractors: Vec<String>,
    pub expected_answer: String,
    /// Zero to three hints, coarsest first
    pub hints: Vec<String>,
}
