//! Subscription window tracking for the wrap stream
//!
//! A restart must not miss wraps published while we were offline, and
//! wrap timestamps are deliberately jittered up to two days into the
//! past. The `since` of a wrap subscription is therefore the last
//! successfully processed event time minus a safety margin, never simply
//! "now"; the replay cache absorbs the resulting redeliveries.

use chrono::Utc;
use parking_lot::Mutex;
use satchel_core::{EnvelopeConfig, IdentityKey, RelayFilter, KIND_GIFT_WRAP};

/// Tracks the last processed event time and derives subscription filters
#[derive(Debug)]
pub struct SubscriptionWindow {
    config: EnvelopeConfig,
    last_processed: Mutex<Option<i64>>,
}

impl SubscriptionWindow {
    /// Create a window with no processing history
    pub fn new(config: EnvelopeConfig) -> Self {
        Self {
            config,
            last_processed: Mutex::new(None),
        }
    }

    /// Resume from a persisted last-processed timestamp (epoch seconds)
    pub fn resume_from(config: EnvelopeConfig, last_processed: i64) -> Self {
        Self {
            config,
            last_processed: Mutex::new(Some(last_processed)),
        }
    }

    /// Note that an event was successfully processed now
    pub fn mark_processed(&self) {
        *self.last_processed.lock() = Some(Utc::now().timestamp());
    }

    /// The last processed timestamp, if any
    pub fn last_processed(&self) -> Option<i64> {
        *self.last_processed.lock()
    }

    /// The `since` bound for the next subscription
    pub fn since(&self) -> i64 {
        let anchor = self
            .last_processed()
            .unwrap_or_else(|| Utc::now().timestamp());
        anchor - self.config.subscription_margin_secs
    }

    /// Build the wrap-stream filter for our identity
    pub fn wrap_filter(&self, ours: &IdentityKey) -> RelayFilter {
        RelayFilter {
            kinds: vec![KIND_GIFT_WRAP],
            p_tags: vec![ours.as_str().to_string()],
            since: self.since(),
        }
    }
}
