//! The offline outbox
//!
//! Holds sends that could not be delivered on either live transport.
//! One lock guards the queue; it is never held across an await, and it
//! is never locked together with any other satchel lock.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use satchel_core::{PeerId, QueuedSend};

/// Queue of undeliverable sends awaiting a reachability change
#[derive(Debug, Default)]
pub struct Outbox {
    entries: Mutex<Vec<QueuedSend>>,
}

impl Outbox {
    /// Create an empty outbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a token for a recipient
    pub fn enqueue(&self, token_payload: String, recipient: PeerId) {
        self.entries.lock().push(QueuedSend {
            token_payload,
            recipient_transport_id: recipient,
            enqueued_at: Utc::now(),
        });
    }

    /// Entries queued for a specific peer
    pub fn for_peer(&self, peer: &PeerId) -> Vec<QueuedSend> {
        self.entries
            .lock()
            .iter()
            .filter(|q| &q.recipient_transport_id == peer)
            .cloned()
            .collect()
    }

    /// Number of entries queued for a peer
    pub fn count_for_peer(&self, peer: &PeerId) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|q| &q.recipient_transport_id == peer)
            .count()
    }

    /// Snapshot of every queued entry
    pub fn all(&self) -> Vec<QueuedSend> {
        self.entries.lock().clone()
    }

    /// Remove one matching entry, if present
    ///
    /// Matches on payload and recipient; called after a flush attempt
    /// succeeds for that entry.
    pub fn remove(&self, entry: &QueuedSend) {
        let mut entries = self.entries.lock();
        if let Some(pos) = entries.iter().position(|q| q == entry) {
            entries.remove(pos);
        }
    }

    /// Remove and return every entry enqueued before the cutoff
    pub fn drain_older_than(&self, cutoff: DateTime<Utc>) -> Vec<QueuedSend> {
        let mut entries = self.entries.lock();
        let (expired, kept): (Vec<_>, Vec<_>) =
            entries.drain(..).partition(|q| q.enqueued_at < cutoff);
        *entries = kept;
        expired
    }
}
