//! Configuration for the delivery subsystem
//!
//! All windows default to the values the protocol was designed around;
//! they are configurable for tests and simulations, not as a tuning
//! surface.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Router policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// How long a queued send stays in the outbox before it expires
    pub outbox_retention_secs: i64,
}

impl RouterConfig {
    /// Outbox retention as a duration
    pub fn outbox_retention(&self) -> Duration {
        Duration::seconds(self.outbox_retention_secs)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            // 24 hours
            outbox_retention_secs: 24 * 60 * 60,
        }
    }
}

/// Envelope protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Upper bound of the backdating jitter applied to seal and wrap
    /// timestamps
    pub timestamp_jitter_secs: i64,
    /// Safety margin subtracted from the last processed time when
    /// computing a subscription's `since`
    pub subscription_margin_secs: i64,
}

impl EnvelopeConfig {
    /// Jitter window as a duration
    pub fn timestamp_jitter(&self) -> Duration {
        Duration::seconds(self.timestamp_jitter_secs)
    }

    /// Subscription margin as a duration
    pub fn subscription_margin(&self) -> Duration {
        Duration::seconds(self.subscription_margin_secs)
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            // up to 2 days in the past
            timestamp_jitter_secs: 2 * 24 * 60 * 60,
            // tolerate the full jitter window plus clock skew
            subscription_margin_secs: 2 * 24 * 60 * 60,
        }
    }
}

/// Replay/dedup cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a seen-envelope record is retained
    pub retention_secs: i64,
}

impl CacheConfig {
    /// Retention as a duration
    pub fn retention(&self) -> Duration {
        Duration::seconds(self.retention_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // 10 days
            retention_secs: 10 * 24 * 60 * 60,
        }
    }
}
