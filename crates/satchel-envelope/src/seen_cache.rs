//! Replay/dedup cache for processed wrap ids
//!
//! The relay network delivers at-least-once, so the subscription path
//! must be idempotent. This cache remembers every wrap id already
//! processed, bounded by pruning records older than the retention window
//! on each insert.

use chrono::{Duration, Utc};
use parking_lot::Mutex;
use satchel_core::{CacheConfig, EventId};
use std::collections::HashMap;

/// Bounded, time-evicted record of envelope ids already processed
///
/// Safe to call concurrently from the subscription callback and the send
/// path; one internal lock serializes all access, so no id is ever
/// double-recorded.
#[derive(Debug)]
pub struct SeenCache {
    entries: Mutex<HashMap<EventId, i64>>,
    retention: Duration,
}

impl SeenCache {
    /// Create an empty cache with the given retention policy
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            retention: config.retention(),
        }
    }

    /// Whether an id has already been processed
    pub fn seen(&self, id: &EventId) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Record an id, pruning entries older than the retention window
    ///
    /// `created_at` is the event's claimed timestamp in epoch seconds;
    /// eviction compares it against now minus retention.
    pub fn record(&self, id: EventId, created_at: i64) {
        let cutoff = (Utc::now() - self.retention).timestamp();
        let mut entries = self.entries.lock();
        entries.retain(|_, at| *at > cutoff);
        entries.insert(id, created_at);
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for SeenCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
