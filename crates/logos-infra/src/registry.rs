//! Process-wide threshold registry
//!
//! One copy-on-write registry holds the active threshold configuration
//! and the A/B experiment table. Readers get a cheap atomic snapshot;
//! writers swap in a fully validated replacement, never mutating the
//! shared value in place while a scoring step may be reading it.
//! Resolved (user, test) assignments are append-only.

use logos_cognitive::stages::{AbAssignments, AbTest};
use logos_types::{LogosError, Result, ThresholdConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Immutable snapshot of the registered configuration
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub thresholds: ThresholdConfig,
    pub tests: HashMap<String, AbTest>,
}

/// Copy-on-write registry for thresholds and experiments
#[derive(Clone)]
pub struct ThresholdRegistry {
    snapshot: Arc<RwLock<Arc<RegistrySnapshot>>>,
    assignments: Arc<RwLock<AbAssignments>>,
}

impl ThresholdRegistry {
    pub fn new(thresholds: ThresholdConfig) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self {
            snapshot: Arc::new(RwLock::new(Arc::new(RegistrySnapshot {
                thresholds,
                tests: HashMap::new(),
            }))),
            assignments: Arc::new(RwLock::new(AbAssignments::new())),
        })
    }

    /// Current snapshot; cheap to call from every scoring step
    pub async fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Swap in a new threshold configuration. The old snapshot stays
    /// valid for readers that already hold it.
    pub async fn update_thresholds(&self, thresholds: ThresholdConfig) -> Result<()> {
        thresholds.validate()?;
        let mut guard = self.snapshot.write().await;
        let mut next = RegistrySnapshot::clone(&guard);
        next.thresholds = thresholds;
        *guard = Arc::new(next);
        info!("threshold configuration updated");
        Ok(())
    }

    /// Register an experiment; the test id must be new
    pub async fn register_test(&self, test: AbTest) -> Result<()> {
        let mut guard = self.snapshot.write().await;
        if guard.tests.contains_key(&test.id) {
            return Err(LogosError::InvalidInput(format!(
                "A/B test '{}' already registered",
                test.id
            )));
        }
        let mut next = RegistrySnapshot::clone(&guard);
        next.tests.insert(test.id.clone(), test);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Resolve a user's group for a registered test; first resolution
    /// is recorded and all later calls return the same group
    pub async fn assign(&self, test_id: &str, user_id: &str) -> Result<String> {
        let snapshot = self.snapshot().await;
        let test = snapshot
            .tests
            .get(test_id)
            .ok_or_else(|| LogosError::NotFound(format!("A/B test '{}'", test_id)))?;
        let mut assignments = self.assignments.write().await;
        Ok(assignments.resolve(test, user_id))
    }

    pub async fn assignment_count(&self) -> usize {
        self.assignments.read().await.len()
    }
}
