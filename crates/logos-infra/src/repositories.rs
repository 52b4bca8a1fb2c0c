//! In-memory repository implementations
//!
//! Trait implementations over tokio-guarded maps, suitable for tests,
//! demos and single-process deployments. Mastery rows carry a version
//! counter; updates verify the version the caller read, so concurrent
//! scoring steps against the same object cannot silently overwrite each
//! other. The scoring transaction stages every write of one response and
//! applies them under a single lock acquisition.

use async_trait::async_trait;
use logos_core::entities::{
    Collocation, Goal, LanguageObject, MasteryState, ObjectEncounter, RelationshipStats,
    ResponseRecord, SessionRecord, StageTransitionRecord, ThetaSnapshot, UserProfile,
};
use logos_core::repository::{
    EncounterRepository, GoalRepository, MasteryRepository, ObjectRepository, ResponseRepository,
    ScoringTransaction, ScoringWrites, SessionRepository, StageTransitionRepository,
    ThresholdRepository, UserRepository,
};
use logos_types::{LogosError, Result, ThresholdConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct StoreState {
    users: HashMap<Uuid, UserProfile>,
    goals: HashMap<Uuid, Goal>,
    objects: HashMap<Uuid, LanguageObject>,
    collocations: Vec<Collocation>,
    masteries: HashMap<Uuid, MasteryState>,
    responses: Vec<ResponseRecord>,
    transitions: Vec<StageTransitionRecord>,
    encounters: Vec<ObjectEncounter>,
    relationship_stats: HashMap<(Uuid, Uuid), RelationshipStats>,
    sessions: HashMap<Uuid, SessionRecord>,
    snapshots: HashMap<Uuid, ThetaSnapshot>,
    thresholds: ThresholdConfig,
}

/// All-in-one in-memory learning store
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended responses, exposed for tests
    pub async fn response_count(&self) -> usize {
        self.state.read().await.responses.len()
    }

    /// Number of appended stage transitions, exposed for tests
    pub async fn transition_count(&self) -> usize {
        self.state.read().await.transitions.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        self.state
            .write()
            .await
            .users
            .insert(profile.id, profile.clone());
        Ok(())
    }
}

#[async_trait]
impl GoalRepository for InMemoryStore {
    async fn get_goal(&self, id: Uuid) -> Result<Option<Goal>> {
        Ok(self.state.read().await.goals.get(&id).cloned())
    }

    async fn list_goals(&self, user_id: Uuid) -> Result<Vec<Goal>> {
        Ok(self
            .state
            .read()
            .await
            .goals
            .values()
            .filter(|goal| goal.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_goal(&self, goal: &Goal) -> Result<()> {
        self.state.write().await.goals.insert(goal.id, goal.clone());
        Ok(())
    }
}

#[async_trait]
impl ObjectRepository for InMemoryStore {
    async fn get_object(&self, id: Uuid) -> Result<Option<LanguageObject>> {
        Ok(self.state.read().await.objects.get(&id).cloned())
    }

    async fn list_objects(&self, goal_id: Uuid) -> Result<Vec<LanguageObject>> {
        Ok(self
            .state
            .read()
            .await
            .objects
            .values()
            .filter(|object| object.goal_id == goal_id)
            .cloned()
            .collect())
    }

    async fn upsert_object(&self, object: &LanguageObject) -> Result<()> {
        let mut state = self.state.write().await;
        // (goal, content) uniqueness: the same content under one goal
        // maps onto the existing object
        let duplicate = state.objects.values().any(|existing| {
            existing.goal_id == object.goal_id
                && existing.content == object.content
                && existing.id != object.id
        });
        if duplicate {
            return Err(LogosError::InvalidInput(format!(
                "object '{}' already exists in goal {}",
                object.content, object.goal_id
            )));
        }
        state.objects.insert(object.id, object.clone());
        Ok(())
    }

    async fn list_collocations(&self, goal_id: Uuid) -> Result<Vec<Collocation>> {
        Ok(self
            .state
            .read()
            .await
            .collocations
            .iter()
            .filter(|c| c.goal_id == goal_id)
            .cloned()
            .collect())
    }

    async fn upsert_collocation(&self, collocation: &Collocation) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.collocations.iter_mut().find(|c| {
            c.goal_id == collocation.goal_id
                && c.first == collocation.first
                && c.second == collocation.second
        }) {
            *existing = collocation.clone();
        } else {
            state.collocations.push(collocation.clone());
        }
        Ok(())
    }
}

fn verified_mastery_insert(
    masteries: &mut HashMap<Uuid, MasteryState>,
    state: &MasteryState,
    expected_version: u64,
) -> Result<()> {
    if let Some(existing) = masteries.get(&state.object_id) {
        if existing.version != expected_version {
            return Err(LogosError::PersistenceFailure(format!(
                "mastery for {} moved from version {} to {}",
                state.object_id, expected_version, existing.version
            )));
        }
    } else if expected_version != 0 {
        return Err(LogosError::PersistenceFailure(format!(
            "mastery for {} does not exist at version {}",
            state.object_id, expected_version
        )));
    }
    let mut next = state.clone();
    next.version = expected_version + 1;
    masteries.insert(next.object_id, next);
    Ok(())
}

#[async_trait]
impl MasteryRepository for InMemoryStore {
    async fn get_mastery(&self, object_id: Uuid) -> Result<Option<MasteryState>> {
        Ok(self.state.read().await.masteries.get(&object_id).cloned())
    }

    async fn upsert_mastery(&self, state: &MasteryState, expected_version: u64) -> Result<()> {
        let mut guard = self.state.write().await;
        verified_mastery_insert(&mut guard.masteries, state, expected_version)
    }
}

#[async_trait]
impl ResponseRepository for InMemoryStore {
    async fn append_response(&self, response: &ResponseRecord) -> Result<()> {
        self.state.write().await.responses.push(response.clone());
        Ok(())
    }

    async fn list_responses(&self, session_id: Uuid) -> Result<Vec<ResponseRecord>> {
        Ok(self
            .state
            .read()
            .await
            .responses
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StageTransitionRepository for InMemoryStore {
    async fn append_stage_transition(&self, record: &StageTransitionRecord) -> Result<()> {
        self.state.write().await.transitions.push(record.clone());
        Ok(())
    }

    async fn list_stage_transitions(
        &self,
        object_id: Uuid,
    ) -> Result<Vec<StageTransitionRecord>> {
        Ok(self
            .state
            .read()
            .await
            .transitions
            .iter()
            .filter(|t| t.object_id == object_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EncounterRepository for InMemoryStore {
    async fn upsert_encounter(&self, encounter: &ObjectEncounter) -> Result<()> {
        self.state.write().await.encounters.push(encounter.clone());
        Ok(())
    }

    async fn get_relationship_stats(
        &self,
        user_id: Uuid,
        object_id: Uuid,
    ) -> Result<Option<RelationshipStats>> {
        Ok(self
            .state
            .read()
            .await
            .relationship_stats
            .get(&(user_id, object_id))
            .cloned())
    }

    async fn upsert_relationship_stats(&self, stats: &RelationshipStats) -> Result<()> {
        self.state
            .write()
            .await
            .relationship_stats
            .insert((stats.user_id, stats.object_id), stats.clone());
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<SessionRecord>> {
        Ok(self.state.read().await.sessions.get(&id).cloned())
    }

    async fn upsert_session(&self, session: &SessionRecord) -> Result<()> {
        self.state
            .write()
            .await
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn write_theta_snapshot(
        &self,
        session_id: Uuid,
        snapshot: &ThetaSnapshot,
    ) -> Result<()> {
        self.state
            .write()
            .await
            .snapshots
            .insert(session_id, snapshot.clone());
        Ok(())
    }
}

#[async_trait]
impl ThresholdRepository for InMemoryStore {
    async fn read_thresholds(&self) -> Result<ThresholdConfig> {
        Ok(self.state.read().await.thresholds)
    }

    async fn write_thresholds(&self, config: &ThresholdConfig) -> Result<()> {
        config.validate()?;
        self.state.write().await.thresholds = *config;
        Ok(())
    }
}

#[async_trait]
impl ScoringTransaction for InMemoryStore {
    /// Apply every write of one scoring step under a single lock. The
    /// mastery version check runs first; any failure leaves the store
    /// untouched.
    async fn commit_scoring(&self, writes: ScoringWrites) -> Result<()> {
        let mut state = self.state.write().await;

        // Verify before any mutation
        verified_mastery_insert(
            &mut state.masteries,
            &writes.mastery,
            writes.expected_mastery_version,
        )?;

        state.users.insert(writes.profile.id, writes.profile);
        state.responses.push(writes.response);
        state.encounters.push(writes.encounter);
        state
            .relationship_stats
            .insert((writes.stats.user_id, writes.stats.object_id), writes.stats);
        if let Some(transition) = writes.transition {
            state.transitions.push(transition);
        }
        state.sessions.insert(writes.session.id, writes.session);
        for (object_id, priority) in writes.priorities {
            if let Some(object) = state.objects.get_mut(&object_id) {
                object.priority = priority;
            }
        }
        Ok(())
    }
}
