//! In-memory relay client

use async_trait::async_trait;
use parking_lot::Mutex;
use satchel_core::{EventHandler, PublishError, RelayClient, RelayEvent, RelayFilter};

/// Relay double with a publish log and synchronous loopback delivery
///
/// Subscribers registered on the same instance receive matching events
/// in the `publish` call itself, which lets tests drive a full
/// wrap/unwrap loop without a network.
#[derive(Default)]
pub struct MemoryRelay {
    published: Mutex<Vec<RelayEvent>>,
    subscribers: Mutex<Vec<(RelayFilter, EventHandler)>>,
    fail_publishes: Mutex<bool>,
}

impl MemoryRelay {
    /// Create a relay with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Make all publishes fail
    pub fn fail_publishes(&self, fail: bool) {
        *self.fail_publishes.lock() = fail;
    }

    /// Every event successfully published, in order
    pub fn published(&self) -> Vec<RelayEvent> {
        self.published.lock().clone()
    }

    /// Number of successful publishes
    pub fn published_count(&self) -> usize {
        self.published.lock().len()
    }

    /// Redeliver an already-published event to matching subscribers
    ///
    /// Models the relay network's at-least-once delivery.
    pub fn redeliver(&self, event: &RelayEvent) {
        let subscribers = self.subscribers.lock().clone();
        for (filter, handler) in subscribers {
            if filter.matches(event) {
                handler(event.clone());
            }
        }
    }
}

#[async_trait]
impl RelayClient for MemoryRelay {
    async fn publish(&self, event: RelayEvent) -> Result<(), PublishError> {
        if *self.fail_publishes.lock() {
            return Err(PublishError::new("injected failure"));
        }
        self.published.lock().push(event.clone());
        self.redeliver(&event);
        Ok(())
    }

    async fn subscribe(
        &self,
        filter: RelayFilter,
        handler: EventHandler,
    ) -> Result<(), PublishError> {
        self.subscribers.lock().push((filter, handler));
        Ok(())
    }
}
