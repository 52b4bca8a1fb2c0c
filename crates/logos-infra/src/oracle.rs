//! Content-oracle adapters
//!
//! The template generator that keeps sessions running when the external
//! provider is down, a timeout wrapper that converts slow calls into
//! `OracleUnavailable`, a token-bucket rate limiter for outbound calls,
//! and the offline queue that retries failed generation requests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logos_core::entities::{TaskContent, TaskSpec};
use logos_core::repository::ContentOracle;
use logos_types::{LogosError, RateLimitConfig, Result, TaskFormat, TaskType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

/// Deterministic template-based generator. Always succeeds; used as the
/// fallback when the external oracle is unavailable and for offline use.
#[derive(Debug, Clone, Default)]
pub struct TemplateOracle;

impl TemplateOracle {
    pub fn new() -> Self {
        Self
    }

    fn prompt_for(spec: &TaskSpec) -> String {
        use TaskType::*;
        let difficulty = spec.target_difficulty;
        match spec.task_type {
            Recognition => "Which of the following have you seen before?".to_string(),
            DefinitionMatch => "Match the term to its definition.".to_string(),
            MultipleChoice => "Choose the best completion.".to_string(),
            Cloze => "Fill in the missing word.".to_string(),
            CollocationMatch => "Which word most naturally accompanies the target?".to_string(),
            WordFormation => "Form the required word from the given root.".to_string(),
            SentenceCompletion => "Complete the sentence appropriately.".to_string(),
            ErrorCorrection => "Find and correct the error.".to_string(),
            Paraphrase => "Restate the sentence in your own words.".to_string(),
            RegisterShift => "Rewrite the sentence for a formal audience.".to_string(),
            SentenceCombining => "Combine the sentences into one.".to_string(),
            TranslationSpot => "Identify the mistranslated segment.".to_string(),
            ListeningDiscrimination => "Select the word you hear.".to_string(),
            PronunciationContrast => "Which pronunciation differs?".to_string(),
            FreeProduction => format!(
                "Write two or three sentences using the target term (difficulty {:.1}).",
                difficulty
            ),
            DialogueCompletion => "Supply the missing turn in the dialogue.".to_string(),
            GenreTransform => "Rewrite the text in the requested genre.".to_string(),
        }
    }

    fn options_for(spec: &TaskSpec) -> (Vec<String>, Vec<String>) {
        match spec.format {
            TaskFormat::SelectedResponse => (
                vec![
                    "option-a".to_string(),
                    "option-b".to_string(),
                    "option-c".to_string(),
                    "option-d".to_string(),
                ],
                vec![
                    "distractor-1".to_string(),
                    "distractor-2".to_string(),
                    "distractor-3".to_string(),
                ],
            ),
            _ => (Vec::new(), Vec::new()),
        }
    }
}

#[async_trait]
impl ContentOracle for TemplateOracle {
    async fn generate(&self, spec: &TaskSpec) -> Result<TaskContent> {
        let (options, distractors) = Self::options_for(spec);
        let hint_count = spec.cue_level.level() as usize;
        let hints = (0..hint_count.min(3))
            .map(|i| format!("hint-{}", i + 1))
            .collect();
        debug!(task = %spec.task_type, "template content generated");
        Ok(TaskContent {
            prompt: Self::prompt_for(spec),
            options,
            distractors,
            expected_answer: "option-a".to_string(),
            hints,
        })
    }
}

/// Token bucket guarding outbound oracle calls; callers await refill
/// rather than failing
#[derive(Debug)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            tokens: config.capacity as f64,
            capacity: config.capacity as f64,
            refill_per_sec: config.refill_per_sec.max(1e-6),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token if available
    pub fn try_acquire(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until the next token becomes available
    fn wait_hint(&self) -> f64 {
        ((1.0 - self.tokens).max(0.0)) / self.refill_per_sec
    }
}

/// Rate-limited, timeout-guarded oracle client. Wraps the real provider;
/// a call that exceeds the timeout or fails surfaces as
/// `OracleUnavailable` for the caller's fallback path.
pub struct OracleClient {
    inner: Arc<dyn ContentOracle>,
    bucket: Mutex<TokenBucket>,
    timeout: Duration,
}

impl OracleClient {
    pub fn new(
        inner: Arc<dyn ContentOracle>,
        rate_limit: &RateLimitConfig,
        timeout_secs: u64,
    ) -> Self {
        Self {
            inner,
            bucket: Mutex::new(TokenBucket::new(rate_limit)),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }

    async fn acquire_token(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                if bucket.try_acquire() {
                    return;
                }
                bucket.wait_hint()
            };
            tokio::time::sleep(Duration::from_secs_f64(wait.clamp(0.01, 1.0))).await;
        }
    }
}

#[async_trait]
impl ContentOracle for OracleClient {
    async fn generate(&self, spec: &TaskSpec) -> Result<TaskContent> {
        self.acquire_token().await;
        match tokio::time::timeout(self.timeout, self.inner.generate(spec)).await {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(error)) => Err(LogosError::OracleUnavailable(error.to_string())),
            Err(_) => Err(LogosError::OracleUnavailable(format!(
                "oracle call exceeded {:?}",
                self.timeout
            ))),
        }
    }
}

/// Lifecycle of one queued generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A generation request parked while the oracle is unavailable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineQueueItem {
    pub id: Uuid,
    pub spec: TaskSpec,
    pub status: QueueStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

/// Queue of failed oracle requests drained when connectivity returns
#[derive(Debug, Default)]
pub struct OfflineQueue {
    items: Vec<OfflineQueueItem>,
    max_retries: u32,
}

impl OfflineQueue {
    pub fn new(max_retries: u32) -> Self {
        Self {
            items: Vec::new(),
            max_retries,
        }
    }

    pub fn enqueue(&mut self, spec: TaskSpec) -> Uuid {
        let item = OfflineQueueItem {
            id: Uuid::new_v4(),
            spec,
            status: QueueStatus::Pending,
            retry_count: 0,
            max_retries: self.max_retries,
            last_error: None,
            enqueued_at: Utc::now(),
        };
        let id = item.id;
        self.items.push(item);
        id
    }

    pub fn pending_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == QueueStatus::Pending)
            .count()
    }

    pub fn item(&self, id: Uuid) -> Option<&OfflineQueueItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Retry every pending item against the oracle. Items that keep
    /// failing move to Failed once their retry budget is spent; content
    /// that succeeds is returned with its request id.
    pub async fn drain(
        &mut self,
        oracle: &dyn ContentOracle,
    ) -> Vec<(Uuid, TaskContent)> {
        let mut completed = Vec::new();
        for item in self.items.iter_mut() {
            if item.status != QueueStatus::Pending {
                continue;
            }
            item.status = QueueStatus::Processing;
            match oracle.generate(&item.spec).await {
                Ok(content) => {
                    item.status = QueueStatus::Completed;
                    completed.push((item.id, content));
                }
                Err(error) => {
                    item.retry_count += 1;
                    item.last_error = Some(error.to_string());
                    if item.retry_count >= item.max_retries {
                        warn!(request = %item.id, "offline request exhausted retries");
                        item.status = QueueStatus::Failed;
                    } else {
                        item.status = QueueStatus::Pending;
                    }
                }
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logos_types::{CueLevel, TaskModality};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn spec(task_type: TaskType, format: TaskFormat) -> TaskSpec {
        TaskSpec {
            object_id: Uuid::new_v4(),
            task_type,
            format,
            modality: TaskModality::Visual,
            cue_level: CueLevel::Moderate,
            target_difficulty: 0.5,
        }
    }

    /// Oracle that fails a fixed number of times before succeeding
    struct FlakyOracle {
        failures_remaining: AtomicU32,
    }

    #[async_trait]
    impl ContentOracle for FlakyOracle {
        async fn generate(&self, spec: &TaskSpec) -> Result<TaskContent> {
            if self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(LogosError::OracleUnavailable("flaky".to_string()));
            }
            TemplateOracle::new().generate(spec).await
        }
    }

    /// Oracle that never completes
    struct HangingOracle;

    #[async_trait]
    impl ContentOracle for HangingOracle {
        async fn generate(&self, _spec: &TaskSpec) -> Result<TaskContent> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_template_covers_every_task_type() {
        let oracle = TemplateOracle::new();
        for task_type in TaskType::ALL {
            let content = oracle
                .generate(&spec(task_type, TaskFormat::SelectedResponse))
                .await
                .unwrap();
            assert!(!content.prompt.is_empty());
            assert!(!content.expected_answer.is_empty());
            assert!(content.hints.len() <= 3);
        }
    }

    #[tokio::test]
    async fn test_selected_response_gets_options() {
        let oracle = TemplateOracle::new();
        let with_options = oracle
            .generate(&spec(TaskType::MultipleChoice, TaskFormat::SelectedResponse))
            .await
            .unwrap();
        assert!(!with_options.options.is_empty());
        assert!(!with_options.distractors.is_empty());

        let without = oracle
            .generate(&spec(TaskType::FreeProduction, TaskFormat::Production))
            .await
            .unwrap();
        assert!(without.options.is_empty());
    }

    #[tokio::test]
    async fn test_hints_follow_cue_level() {
        let oracle = TemplateOracle::new();
        let mut task_spec = spec(TaskType::Cloze, TaskFormat::ConstructedResponse);
        task_spec.cue_level = CueLevel::None;
        assert!(oracle.generate(&task_spec).await.unwrap().hints.is_empty());
        task_spec.cue_level = CueLevel::Maximum;
        assert_eq!(oracle.generate(&task_spec).await.unwrap().hints.len(), 3);
    }

    #[test]
    fn test_token_bucket_exhausts_and_refills() {
        let mut bucket = TokenBucket::new(&RateLimitConfig {
            capacity: 2,
            refill_per_sec: 1000.0,
        });
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
        std::thread::sleep(Duration::from_millis(5));
        assert!(bucket.try_acquire());
    }

    #[tokio::test]
    async fn test_client_times_out_to_unavailable() {
        let client = OracleClient::new(
            Arc::new(HangingOracle),
            &RateLimitConfig::default(),
            1,
        );
        let result = client
            .generate(&spec(TaskType::Cloze, TaskFormat::ConstructedResponse))
            .await;
        assert!(matches!(result, Err(LogosError::OracleUnavailable(_))));
    }

    #[tokio::test]
    async fn test_offline_queue_retries_until_success() {
        let oracle = FlakyOracle {
            failures_remaining: AtomicU32::new(2),
        };
        let mut queue = OfflineQueue::new(5);
        let id = queue.enqueue(spec(TaskType::Cloze, TaskFormat::ConstructedResponse));

        let first = queue.drain(&oracle).await;
        assert!(first.is_empty());
        assert_eq!(queue.item(id).unwrap().retry_count, 1);

        let second = queue.drain(&oracle).await;
        assert!(second.is_empty());

        let third = queue.drain(&oracle).await;
        assert_eq!(third.len(), 1);
        assert_eq!(queue.item(id).unwrap().status, QueueStatus::Completed);
    }

    #[tokio::test]
    async fn test_offline_queue_marks_failed_after_budget() {
        let oracle = FlakyOracle {
            failures_remaining: AtomicU32::new(100),
        };
        let mut queue = OfflineQueue::new(2);
        let id = queue.enqueue(spec(TaskType::Cloze, TaskFormat::ConstructedResponse));
        queue.drain(&oracle).await;
        queue.drain(&oracle).await;
        let item = queue.item(id).unwrap();
        assert_eq!(item.status, QueueStatus::Failed);
        assert_eq!(item.retry_count, 2);
        assert!(item.last_error.is_some());
        assert_eq!(queue.pending_count(), 0);
    }
}
