//! Debounced, coalescing update queue.
//!
//! Absorbs high-frequency triggers (render frames) into one pass per window.
//! The first [`poll_fire`](BatchQueue::poll_fire) in a quiet period fires at
//! once; later polls inside the window are coalesced.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use metrics::gauge;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::lock::mutex_lock;
use crate::config::BatchSettings;

const SOURCE: &str = "feature::batch";
const METRIC_BATCH_PENDING: &str = "titlekeeper_batch_pending";

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub window: Duration,
    /// Remove every checked key after a pass, not only the changed ones.
    pub drop_unchanged: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::from(&BatchSettings::default())
    }
}

impl From<&BatchSettings> for BatchConfig {
    fn from(settings: &BatchSettings) -> Self {
        Self {
            window: settings.window,
            drop_unchanged: settings.drop_unchanged,
        }
    }
}

/// Pending keys plus a leading-edge firing gate.
///
/// A pass removes a key only when its update reported a change, so a key
/// whose title never changes is retried on every firing. Set
/// [`BatchConfig::drop_unchanged`] to remove every checked key instead.
pub struct BatchQueue {
    config: BatchConfig,
    pending: Mutex<HashSet<String>>,
    last_fired: Mutex<Option<Instant>>,
}

impl BatchQueue {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            pending: Mutex::new(HashSet::new()),
            last_fired: Mutex::new(None),
        }
    }

    /// Add `key`; returns false when it was already pending.
    pub fn enqueue(&self, key: impl Into<String>) -> bool {
        let mut pending = mutex_lock(&self.pending, SOURCE, "enqueue");
        let added = pending.insert(key.into());
        gauge!(METRIC_BATCH_PENDING).set(pending.len() as f64);
        added
    }

    /// Fire if no firing happened within the window. Returns a snapshot of the
    /// pending keys to process, or `None` when coalesced.
    pub fn poll_fire(&self) -> Option<Vec<String>> {
        let now = Instant::now();
        {
            let mut last_fired = mutex_lock(&self.last_fired, SOURCE, "poll_fire");
            if let Some(fired) = *last_fired
                && now.duration_since(fired) < self.config.window
            {
                return None;
            }
            *last_fired = Some(now);
        }

        let snapshot = self.snapshot();
        debug!(pending = snapshot.len(), "Batch window fired");
        Some(snapshot)
    }

    /// Run `update` for each key of `batch`, in order, removing keys per the
    /// retention policy. Returns how many keys were removed.
    pub async fn process<F, Fut>(&self, batch: Vec<String>, mut update: F) -> usize
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut removed = 0;
        for key in batch {
            let changed = update(key.clone()).await;
            if (changed || self.config.drop_unchanged) && self.remove(&key) {
                removed += 1;
            } else {
                debug!(key = %key, "Key kept for next batch");
            }
        }
        removed
    }

    pub fn remove(&self, key: &str) -> bool {
        let mut pending = mutex_lock(&self.pending, SOURCE, "remove");
        let removed = pending.remove(key);
        gauge!(METRIC_BATCH_PENDING).set(pending.len() as f64);
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        mutex_lock(&self.pending, SOURCE, "contains").contains(key)
    }

    pub fn snapshot(&self) -> Vec<String> {
        mutex_lock(&self.pending, SOURCE, "snapshot")
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.pending, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        mutex_lock(&self.pending, SOURCE, "clear").clear();
        gauge!(METRIC_BATCH_PENDING).set(0.0);
    }
}

impl Default for BatchQueue {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}
