//! Bounded task-content cache
//!
//! LRU with TTL, keyed by (object, task type, format). Expired entries
//! are evicted when read; capacity overflow evicts the least recently
//! accessed entry. Generated content is expensive, so the session
//! pipeline consults this cache before calling the oracle.

use async_trait::async_trait;
use logos_core::entities::{TaskContent, TaskSpec};
use logos_core::repository::ContentOracle;
use logos_types::{CacheConfig, Result, TaskFormat, TaskType};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Cache key: one entry per (object, task type, format)
pub type TaskKey = (Uuid, TaskType, TaskFormat);

struct CacheEntry {
    content: TaskContent,
    inserted_at: Instant,
    last_accessed: Instant,
}

/// Bounded LRU + TTL cache for generated task content
pub struct TaskCache {
    entries: HashMap<TaskKey, CacheEntry>,
    capacity: usize,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl TaskCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: config.capacity.max(1),
            ttl: Duration::from_secs(config.ttl_secs),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Fetch a cached entry, evicting it first if its TTL has lapsed
    pub fn get(&mut self, key: &TaskKey) -> Option<TaskContent> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&mut self, key: &TaskKey, now: Instant) -> Option<TaskContent> {
        let expired = match self.entries.get(key) {
            Some(entry) => now.duration_since(entry.inserted_at) >= self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };
        if expired {
            self.entries.remove(key);
            self.misses += 1;
            return None;
        }
        self.hits += 1;
        let entry = self.entries.get_mut(key)?;
        entry.last_accessed = now;
        Some(entry.content.clone())
    }

    /// Insert content, evicting the least recently accessed entry when
    /// the cache is full
    pub fn insert(&mut self, key: TaskKey, content: TaskContent) {
        self.insert_at(key, content, Instant::now());
    }

    fn insert_at(&mut self, key: TaskKey, content: TaskContent, now: Instant) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            let eldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| *key);
            if let Some(eldest) = eldest {
                self.entries.remove(&eldest);
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                content,
                inserted_at: now,
                last_accessed: now,
            },
        );
    }

    /// Drop every expired entry; returns how many were evicted
    pub fn evict_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < ttl);
        before - self.entries.len()
    }
}

/// Oracle middleware that serves repeated task requests from the cache.
/// Compose it over the rate-limited client so that cache hits skip both
/// the token bucket and the provider.
pub struct CachingOracle {
    inner: Arc<dyn ContentOracle>,
    cache: Mutex<TaskCache>,
}

impl CachingOracle {
    pub fn new(inner: Arc<dyn ContentOracle>, config: &CacheConfig) -> Self {
        Self {
            inner,
            cache: Mutex::new(TaskCache::new(config)),
        }
    }

    pub async fn hit_rate(&self) -> f64 {
        self.cache.lock().await.hit_rate()
    }
}

#[async_trait]
impl ContentOracle for CachingOracle {
    async fn generate(&self, spec: &TaskSpec) -> Result<TaskContent> {
        let key: TaskKey = (spec.object_id, spec.task_type, spec.format);
        if let Some(content) = self.cache.lock().await.get(&key) {
            return Ok(content);
        }
        let content = self.inner.generate(spec).await?;
        self.cache.lock().await.insert(key, content.clone());
        Ok(content)
    }
}
