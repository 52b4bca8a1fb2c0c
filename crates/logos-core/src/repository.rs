//! Repository and oracle ports
//!
//! The persistence and content-generation contracts the core consumes.
//! Infrastructure provides the implementations; the core never touches
//! storage or the network directly. All writes belonging to one scoring
//! step travel together through [`ScoringTransaction`] so that a
//! response either lands completely or not at all.

use crate::entities::{
    Collocation, Goal, LanguageObject, MasteryState, ObjectEncounter, RelationshipStats,
    ResponseRecord, SessionRecord, StageTransitionRecord, TaskContent, TaskSpec, ThetaSnapshot,
    UserProfile,
};
use async_trait::async_trait;
use logos_types::{Result, ThresholdConfig};
use uuid::Uuid;

/// User profiles
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>>;
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()>;
}

/// Goals per user
#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn get_goal(&self, id: Uuid) -> Result<Option<Goal>>;
    async fn list_goals(&self, user_id: Uuid) -> Result<Vec<Goal>>;
    async fn upsert_goal(&self, goal: &Goal) -> Result<()>;
}

/// Language objects and collocations per goal
#[async_trait]
pub trait ObjectRepository: Send + Sync {
    async fn get_object(&self, id: Uuid) -> Result<Option<LanguageObject>>;
    async fn list_objects(&self, goal_id: Uuid) -> Result<Vec<LanguageObject>>;
    async fn upsert_object(&self, object: &LanguageObject) -> Result<()>;
    async fn list_collocations(&self, goal_id: Uuid) -> Result<Vec<Collocation>>;
    async fn upsert_collocation(&self, collocation: &Collocation) -> Result<()>;
}

/// Mastery state per object, updated with optimistic concurrency: the
/// caller passes the version it read, and the store rejects the write if
/// the row has moved on. Last-writer-wins is thereby ruled out.
#[async_trait]
pub trait MasteryRepository: Send + Sync {
    async fn get_mastery(&self, object_id: Uuid) -> Result<Option<MasteryState>>;
    /// Insert or update; fails with `PersistenceFailure` when
    /// `expected_version` no longer matches the stored row
    async fn upsert_mastery(&self, state: &MasteryState, expected_version: u64) -> Result<()>;
}

/// Append-only response log
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    async fn append_response(&self, response: &ResponseRecord) -> Result<()>;
    async fn list_responses(&self, session_id: Uuid) -> Result<Vec<ResponseRecord>>;
}

/// Append-only stage-transition audit log
#[async_trait]
pub trait StageTransitionRepository: Send + Sync {
    async fn append_stage_transition(&self, record: &StageTransitionRecord) -> Result<()>;
    async fn list_stage_transitions(&self, object_id: Uuid) -> Result<Vec<StageTransitionRecord>>;
}

/// Encounters and their per-(user, object) aggregates
#[async_trait]
pub trait EncounterRepository: Send + Sync {
    async fn upsert_encounter(&self, encounter: &ObjectEncounter) -> Result<()>;
    async fn get_relationship_stats(
        &self,
        user_id: Uuid,
        object_id: Uuid,
    ) -> Result<Option<RelationshipStats>>;
    async fn upsert_relationship_stats(&self, stats: &RelationshipStats) -> Result<()>;
}

/// Sessions and theta snapshots
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>>;
    async fn upsert_session(&self, session: &SessionRecord) -> Result<()>;
    async fn write_theta_snapshot(&self, session_id: Uuid, snapshot: &ThetaSnapshot) -> Result<()>;
}

/// Process-wide threshold configuration
#[async_trait]
pub trait ThresholdRepository: Send + Sync {
    async fn read_thresholds(&self) -> Result<ThresholdConfig>;
    async fn write_thresholds(&self, config: &ThresholdConfig) -> Result<()>;
}

/// Everything one scoring step writes. Committed atomically: on any
/// failure nothing is visible and the response is not counted.
#[derive(Debug, Clone)]
pub struct ScoringWrites {
    pub response: ResponseRecord,
    pub mastery: MasteryState,
    /// Version of the mastery row the scoring step read
    pub expected_mastery_version: u64,
    pub profile: UserProfile,
    pub encounter: ObjectEncounter,
    pub stats: RelationshipStats,
    pub transition: Option<StageTransitionRecord>,
    pub session: SessionRecord,
    /// Refreshed cached priorities for the object and its collocation
    /// neighbours
    pub priorities: Vec<(Uuid, f64)>,
}

/// Atomic commit point for one scoring step
#[async_trait]
pub trait ScoringTransaction: Send + Sync {
    async fn commit_scoring(&self, writes: ScoringWrites) -> Result<()>;
}

/// External content generator. Implementations signal
/// `OracleUnavailable` on timeout or provider failure; callers fall back
/// to template generation and keep scoring.
#[async_trait]
pub trait ContentOracle: Send + Sync {
    async fn generate(&self, spec: &TaskSpec) -> Result<TaskContent>;
}

/// The full persistence surface the orchestrator needs, bundled
pub trait LearningStore:
    UserRepository
    + GoalRepository
    + ObjectRepository
    + MasteryRepository
    + ResponseRepository
    + StageTransitionRepository
    + EncounterRepository
    + SessionRepository
    + ThresholdRepository
    + ScoringTransaction
{
}

impl<T> LearningStore for T where
    T: UserRepository
        + GoalRepository
        + ObjectRepository
        + MasteryRepository
        + ResponseRepository
        + StageTransitionRepository
        + EncounterRepository
        + SessionRepository
        + ThresholdRepository
        + ScoringTransaction
{
}
