//! Session orchestration
//!
//! One actor per active session owns that session's queue and working
//! ability/scheduling state; every mutation flows through its command
//! loop, which gives strict arrival ordering within the session. The
//! per-response pipeline has three layers: state to priority (queue),
//! task generation (oracle with template fallback), and scoring to
//! update (rating, FSRS, EAP theta, stage check, encounter stats,
//! priority refresh) committed as one transaction. A failed commit
//! rolls the working profile back to the last consistent state.

use crate::bottleneck::{BottleneckConfig, BottleneckDetector, ComponentOutcome};
use crate::encounter::EncounterAggregator;
use crate::features;
use crate::priority::{build_queue, PriorityContext, PriorityEngine, QueueItem};
use crate::stages::{recommend_cue_level, StageMachine};
use crate::timing::{
    detect_suspicious_patterns, rate_response, SuspiciousPattern, TimingClass,
};
use chrono::Utc;
use logos_core::entities::{
    Goal, LanguageObject, MasteryState, ObjectEncounter, RelationshipStats, ResponseRecord,
    SessionRecord, StageTransitionRecord, TaskContent, TaskSpec, ThetaSnapshot, UserProfile,
};
use logos_core::irt::{estimate_theta_eap, EapConfig, ThetaEstimate};
use logos_core::fsrs::FsrsScheduler;
use logos_core::repository::{ContentOracle, LearningStore, ScoringWrites};
use logos_core::numerics::QuadratureGrade;
use logos_types::{
    CueLevel, InteractionCategory, LogosError, Modality, Rating, Result, SessionConfig,
    SessionMode, TaskFormat, TaskModality,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Minimum prior standard deviation fed into the EAP update; a very
/// confident prior would freeze the estimate
const MIN_PRIOR_SD: f64 = 0.3;

/// What the learner sends back for one task
#[derive(Debug, Clone)]
pub struct ResponsePayload {
    pub correct: bool,
    pub response_time_ms: u32,
    pub response_content: Option<String>,
}

/// A task ready to present
#[derive(Debug, Clone)]
pub struct PresentedTask {
    pub spec: TaskSpec,
    pub content: TaskContent,
    /// True when the content came from the template fallback
    pub from_fallback: bool,
}

/// Everything the scoring layer decided for one response
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    pub response_id: Uuid,
    pub rating: Rating,
    pub timing: TimingClass,
    pub component_theta: ThetaEstimate,
    pub transition: Option<StageTransitionRecord>,
    pub suspicious: Vec<SuspiciousPattern>,
}

enum Command {
    NextTask(oneshot::Sender<Result<PresentedTask>>),
    Submit(ResponsePayload, oneshot::Sender<Result<ScoringOutcome>>),
    Close(oneshot::Sender<Result<SessionRecord>>),
}

/// Client handle to a running session actor
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn send<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> Command,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(build(tx))
            .await
            .map_err(|_| LogosError::InconsistentState("session actor terminated".to_string()))?;
        rx.await
            .map_err(|_| LogosError::InconsistentState("session actor dropped reply".to_string()))?
    }

    /// Layer 1 and 2: pick the queue head and produce its task
    pub async fn next_task(&self) -> Result<PresentedTask> {
        self.send(Command::NextTask).await
    }

    /// Layer 3: score the in-flight task and commit all updates
    pub async fn submit_response(&self, payload: ResponsePayload) -> Result<ScoringOutcome> {
        self.send(|tx| Command::Submit(payload, tx)).await
    }

    /// Flush, snapshot theta and end the session; safe to call twice
    pub async fn close(&self) -> Result<SessionRecord> {
        self.send(Command::Close).await
    }
}

/// Engines and configuration a session actor runs with
pub struct SessionRuntime {
    pub session_config: SessionConfig,
    pub scheduler: FsrsScheduler,
    pub priority: PriorityEngine,
    pub stage_machine: StageMachine,
    pub aggregator: EncounterAggregator,
    pub bottleneck: BottleneckConfig,
}

/// The session actor; owns queue and working state for one session
pub struct SessionActor<S: LearningStore + 'static> {
    store: Arc<S>,
    oracle: Arc<dyn ContentOracle>,
    fallback: Arc<dyn ContentOracle>,
    runtime: SessionRuntime,

    session: SessionRecord,
    goal: Goal,
    profile: UserProfile,
    /// Restored on a failed commit so a persistence error never leaves
    /// the profile partially updated
    last_consistent_profile: UserProfile,
    objects: HashMap<Uuid, LanguageObject>,
    neighbors: HashMap<Uuid, Vec<Uuid>>,

    queue: VecDeque<QueueItem>,
    current: Option<QueueItem>,
    detector: BottleneckDetector,
    timing_history: Vec<(u32, bool)>,

    rx: mpsc::Receiver<Command>,
}

impl<S: LearningStore + 'static> SessionActor<S> {
    /// Load the session's working set and spawn the actor task
    pub async fn spawn(
        store: Arc<S>,
        oracle: Arc<dyn ContentOracle>,
        fallback: Arc<dyn ContentOracle>,
        runtime: SessionRuntime,
        user_id: Uuid,
        goal_id: Uuid,
        mode: SessionMode,
    ) -> Result<SessionHandle> {
        let profile = store
            .get_user(user_id)
            .await?
            .ok_or_else(|| LogosError::NotFound(format!("user {}", user_id)))?;
        let goal = store
            .get_goal(goal_id)
            .await?
            .ok_or_else(|| LogosError::NotFound(format!("goal {}", goal_id)))?;

        let object_list = store.list_objects(goal_id).await?;
        let mut objects = HashMap::new();
        for object in object_list {
            objects.insert(object.id, object);
        }
        let mut neighbors: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for collocation in store.list_collocations(goal_id).await? {
            neighbors
                .entry(collocation.first)
                .or_default()
                .push(collocation.second);
            neighbors
                .entry(collocation.second)
                .or_default()
                .push(collocation.first);
        }

        let session = SessionRecord::new(user_id, goal_id, mode);
        store.upsert_session(&session).await?;
        info!(session = %session.id, goal = %goal_id, "session started");

        let (tx, rx) = mpsc::channel(32);
        let detector = BottleneckDetector::new(runtime.bottleneck.clone());
        let actor = SessionActor {
            store,
            oracle,
            fallback,
            runtime,
            session,
            goal,
            last_consistent_profile: profile.clone(),
            profile,
            objects,
            neighbors,
            queue: VecDeque::new(),
            current: None,
            detector,
            timing_history: Vec::new(),
            rx,
        };
        tokio::spawn(actor.run());
        Ok(SessionHandle { tx })
    }

    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::NextTask(reply) => {
                    let result = self.next_task().await;
                    let _ = reply.send(result);
                }
                Command::Submit(payload, reply) => {
                    let result = self.score_response(payload).await;
                    let _ = reply.send(result);
                }
                Command::Close(reply) => {
                    let result = self.close_session().await;
                    let _ = reply.send(result);
                }
            }
        }
    }

    async fn load_masteries(&self) -> Result<HashMap<Uuid, MasteryState>> {
        let mut masteries = HashMap::new();
        for id in self.objects.keys() {
            let mastery = self
                .store
                .get_mastery(*id)
                .await?
                .unwrap_or_else(|| MasteryState::new(*id));
            masteries.insert(*id, mastery);
        }
        Ok(masteries)
    }

    /// Layer 1: state to priority. Rebuilds the queue when empty, with
    /// the current bottleneck boost applied.
    async fn refill_queue(&mut self) -> Result<()> {
        let masteries = self.load_masteries().await?;
        let objects: Vec<LanguageObject> = self.objects.values().cloned().collect();
        let context = PriorityContext {
            user: &self.profile,
            goal: &self.goal,
            bottleneck: None,
            knowledge_strength: 0.0,
            now: Utc::now(),
        };
        let report = self.detector.analyze();
        let queue = build_queue(
            &objects,
            &masteries,
            &self.runtime.priority,
            &context,
            &self.runtime.session_config,
            report.as_ref(),
        );
        debug!(session = %self.session.id, length = queue.len(), "queue rebuilt");
        self.queue = queue.into();
        Ok(())
    }

    /// Layer 2: task generation with template fallback
    async fn next_task(&mut self) -> Result<PresentedTask> {
        if self.queue.is_empty() {
            self.refill_queue().await?;
        }
        let item = self
            .queue
            .pop_front()
            .ok_or_else(|| LogosError::NotFound("queue is empty".to_string()))?;
        let object = self
            .objects
            .get(&item.object_id)
            .ok_or_else(|| LogosError::NotFound(format!("object {}", item.object_id)))?;
        let mastery = self
            .store
            .get_mastery(object.id)
            .await?
            .unwrap_or_else(|| MasteryState::new(object.id));

        let cue_level = recommend_cue_level(
            mastery.cue_free_accuracy,
            mastery.cue_assisted_accuracy,
            mastery.exposure_count,
        );
        let spec = TaskSpec {
            object_id: object.id,
            task_type: item.task_type,
            format: features::task_format(item.task_type),
            modality: features::select_modality(&object.z),
            cue_level,
            target_difficulty: object.params.b,
        };

        let (content, from_fallback) = match self.oracle.generate(&spec).await {
            Ok(content) => (content, false),
            Err(LogosError::OracleUnavailable(reason)) => {
                warn!(session = %self.session.id, %reason, "oracle unavailable, using template");
                (self.fallback.generate(&spec).await?, true)
            }
            Err(other) => return Err(other),
        };

        self.current = Some(item);
        Ok(PresentedTask {
            spec,
            content,
            from_fallback,
        })
    }

    /// Layer 3: scoring to update, atomically committed
    async fn score_response(&mut self, payload: ResponsePayload) -> Result<ScoringOutcome> {
        let item = self
            .current
            .clone()
            .ok_or_else(|| LogosError::InvalidInput("no task in flight".to_string()))?;
        if payload.response_time_ms == 0 {
            return Err(LogosError::InvalidInput(
                "response time must be positive".to_string(),
            ));
        }
        let object = self
            .objects
            .get(&item.object_id)
            .cloned()
            .ok_or_else(|| LogosError::NotFound(format!("object {}", item.object_id)))?;

        let mut mastery = self
            .store
            .get_mastery(object.id)
            .await?
            .unwrap_or_else(|| MasteryState::new(object.id));
        let expected_version = mastery.version;
        let now = Utc::now();

        // Rating from response time
        let (timing, rating) = rate_response(
            payload.response_time_ms,
            item.task_type,
            mastery.stage,
            object.content.chars().count(),
            payload.correct,
        );

        self.timing_history
            .push((payload.response_time_ms, payload.correct));
        let suspicious = detect_suspicious_patterns(&self.timing_history);
        let trusted = suspicious.is_empty();

        // Working copies; nothing is visible until the commit succeeds
        let mut profile = self.profile.clone();
        let mut session = self.session.clone();
        let component = object.component();
        let cue_level = recommend_cue_level(
            mastery.cue_free_accuracy,
            mastery.cue_assisted_accuracy,
            mastery.exposure_count,
        );

        let previous = profile.component(component);
        let mut component_estimate = ThetaEstimate {
            theta: previous.theta,
            se: previous.se,
            iterations: 0,
            converged: true,
        };
        let mut transition = None;

        if trusted {
            // FSRS update
            mastery.card = self
                .runtime
                .scheduler
                .review(&mastery.card, rating, now)?;
            mastery.again_streak = if rating == Rating::Again {
                mastery.again_streak.saturating_add(1)
            } else {
                0
            };
            mastery.record_accuracy(cue_level > CueLevel::None, payload.correct);
            if !mastery.gap_consistent() {
                warn!(
                    object = %mastery.object_id,
                    gap = mastery.scaffolding_gap(),
                    "scaffolding gap inconsistent, clamping into tolerance"
                );
            }

            // EAP theta update with the previous estimate as prior
            let eap = EapConfig::new(
                previous.theta,
                previous.se.max(MIN_PRIOR_SD),
                QuadratureGrade::Session,
            )?;
            component_estimate =
                estimate_theta_eap(&[object.params], &[payload.correct], &eap)?;
            profile
                .component_theta
                .entry(component)
                .or_default()
                .observe(component_estimate.theta, component_estimate.se);

            let global_prior = profile.global_theta;
            let global_eap = EapConfig::new(
                global_prior.theta,
                global_prior.se.max(MIN_PRIOR_SD),
                QuadratureGrade::Session,
            )?;
            let global_estimate =
                estimate_theta_eap(&[object.params], &[payload.correct], &global_eap)?;
            profile
                .global_theta
                .observe(global_estimate.theta, global_estimate.se);
            profile.updated_at = now;

            // Stage machine: regression first, then promotion
            transition = self
                .runtime
                .stage_machine
                .check_regression(&mastery)
                .or_else(|| self.runtime.stage_machine.check_transition(&mastery));
            if let Some(record) = &transition {
                mastery.stage = record.to_stage;
                if record.trigger == "regression" {
                    mastery.again_streak = 0;
                }
                session.stage_transitions += 1;
            }
        }

        // Bottleneck window sees every genuine outcome
        let response = {
            let mut response = ResponseRecord::new(
                session.id,
                object.id,
                item.task_type,
                features::task_format(item.task_type),
                features::select_modality(&object.z),
                payload.correct,
                payload.response_time_ms,
                cue_level,
            )?;
            response.response_content = payload.response_content.clone();
            response.theta_contribution = trusted
                .then(|| component_estimate.theta - previous.theta);
            response
        };
        if trusted {
            self.detector.record(ComponentOutcome {
                response_id: response.id,
                component,
                correct: payload.correct,
                error_pattern: None,
            });
        }

        // Encounter aggregation
        let encounter = ObjectEncounter {
            id: Uuid::new_v4(),
            user_id: profile.id,
            object_id: object.id,
            category: interaction_category(features::task_format(item.task_type)),
            modality: encounter_modality(features::select_modality(&object.z)),
            domain: self.goal.domain,
            correct: payload.correct,
            response_time_ms: payload.response_time_ms,
            theta_at_encounter: previous.theta,
            difficulty_at_encounter: object.params.b,
            occurred_at: now,
        };
        let mut stats = self
            .store
            .get_relationship_stats(profile.id, object.id)
            .await?
            .unwrap_or_else(|| RelationshipStats::new(profile.id, object.id));
        self.runtime.aggregator.record(&mut stats, &encounter);

        // Priority refresh for the object and its collocation neighbours
        let report = self.detector.analyze();
        let context = PriorityContext {
            user: &profile,
            goal: &self.goal,
            bottleneck: report.as_ref().map(|r| r.primary),
            knowledge_strength: stats.knowledge_strength,
            now,
        };
        let mut priorities = Vec::new();
        let own_priority = self.runtime.priority.score(&object, &mastery, &context);
        mastery.priority = own_priority;
        priorities.push((object.id, own_priority));
        for neighbor_id in self.neighbors.get(&object.id).cloned().unwrap_or_default() {
            if let Some(neighbor) = self.objects.get(&neighbor_id) {
                let neighbor_mastery = self
                    .store
                    .get_mastery(neighbor_id)
                    .await?
                    .unwrap_or_else(|| MasteryState::new(neighbor_id));
                priorities.push((
                    neighbor_id,
                    self.runtime.priority.score(neighbor, &neighbor_mastery, &context),
                ));
            }
        }

        // Session counters
        session.response_count += 1;
        session.items_practiced += 1;
        if payload.correct {
            session.correct_count += 1;
        }
        if rating == Rating::Easy {
            session.fluency_tasks += 1;
        }
        if features::task_format(item.task_type) == TaskFormat::Production {
            session.versatility_tasks += 1;
        }

        let writes = ScoringWrites {
            response: response.clone(),
            mastery,
            expected_mastery_version: expected_version,
            profile: profile.clone(),
            encounter,
            stats,
            transition: transition.clone(),
            session: session.clone(),
            priorities,
        };

        match self.store.commit_scoring(writes).await {
            Ok(()) => {
                self.profile = profile;
                self.last_consistent_profile = self.profile.clone();
                self.session = session;
                self.current = None;
                debug!(
                    session = %self.session.id,
                    object = %object.id,
                    rating = ?rating,
                    timing = ?timing,
                    "response scored"
                );
                Ok(ScoringOutcome {
                    response_id: response.id,
                    rating,
                    timing,
                    component_theta: component_estimate,
                    transition,
                    suspicious,
                })
            }
            Err(error) => {
                // Nothing persisted; restore the last consistent profile
                self.profile = self.last_consistent_profile.clone();
                warn!(session = %self.session.id, %error, "scoring commit failed, rolled back");
                Err(LogosError::PersistenceFailure(format!(
                    "scoring step aborted: {}",
                    error
                )))
            }
        }
    }

    /// Close: flush the session, snapshot theta. Idempotent.
    async fn close_session(&mut self) -> Result<SessionRecord> {
        if self.session.ended_at.is_none() {
            let snapshot = ThetaSnapshot::of(&self.profile);
            self.session.close(snapshot.clone());
            self.store
                .write_theta_snapshot(self.session.id, &snapshot)
                .await?;
            self.store.upsert_session(&self.session).await?;
            self.store.upsert_user(&self.profile).await?;
            info!(
                session = %self.session.id,
                responses = self.session.response_count,
                "session closed"
            );
        }
        Ok(self.session.clone())
    }
}

/// Selected and constructed responses exercise interpretation; free
/// production exercises production
fn interaction_category(format: TaskFormat) -> InteractionCategory {
    match format {
        TaskFormat::Production => InteractionCategory::Production,
        _ => InteractionCategory::Interpretation,
    }
}

/// Fold the presentation channel back onto a goal modality for
/// encounter bookkeeping
fn encounter_modality(modality: TaskModality) -> Modality {
    match modality {
        TaskModality::Visual => Modality::Reading,
        TaskModality::Auditory => Modality::Listening,
        TaskModality::Mixed => Modality::Speaking,
    }
}
