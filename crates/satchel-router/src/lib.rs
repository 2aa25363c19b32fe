//! Transport-selection router for bearer-token delivery
//!
//! One policy chain per send: the mesh transport when the recipient is
//! reachable (no connectivity needed, lowest latency), the relay
//! transport when the contact directory reports a mutual favorite with a
//! known relay identity (guaranteed eventual delivery), and the local
//! outbox when neither is viable. Transport failures fall through the
//! chain automatically; only total exhaustion is visible to the caller.
//!
//! Queued sends are retried exactly when the router is told a peer
//! became reachable ([`TransportRouter::flush`]), and expire after the
//! configured retention window.

use chrono::Utc;
use satchel_core::{
    ContactDirectory, MeshTransport, PeerId, QueuedSend, RelayClient, RelayEvent, RelayFilter,
    RouterConfig, SatchelResult, TokenRedeemer, TokenTransferRecord,
};
use satchel_envelope::{GiftWrapper, SubscriptionWindow, TokenTransferContent};
use tracing::{debug, warn};

mod outbox;

pub use outbox::Outbox;

/// The transport that carried a successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Short-range mesh transport
    Mesh,
    /// Store-and-forward relay network
    Relay,
}

/// Outcome of a send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accepted by a transport
    Sent(TransportKind),
    /// Neither transport was viable; queued for a later flush
    Queued,
    /// Delivery gave up
    Failed {
        /// Why delivery failed
        reason: String,
    },
}

/// Routes token sends across the mesh and relay transports
///
/// Mesh-success and relay-success are mutually exclusive per send
/// attempt; duplicate delivery across transports (e.g. a flushed queue
/// entry racing a relay publish) is absorbed by the redemption
/// collaborator's idempotence.
pub struct TransportRouter<M, R, D, T> {
    mesh: M,
    relay: R,
    directory: D,
    redeemer: T,
    wrapper: GiftWrapper,
    window: SubscriptionWindow,
    our_peer: PeerId,
    config: RouterConfig,
    outbox: Outbox,
}

impl<M, R, D, T> TransportRouter<M, R, D, T>
where
    M: MeshTransport,
    R: RelayClient,
    D: ContactDirectory,
    T: TokenRedeemer,
{
    /// Create a router over the four collaborators
    pub fn new(
        mesh: M,
        relay: R,
        directory: D,
        redeemer: T,
        wrapper: GiftWrapper,
        window: SubscriptionWindow,
        our_peer: PeerId,
        config: RouterConfig,
    ) -> Self {
        Self {
            mesh,
            relay,
            directory,
            redeemer,
            wrapper,
            window,
            our_peer,
            config,
            outbox: Outbox::new(),
        }
    }

    /// Send a token transfer to a recipient, choosing the transport
    ///
    /// Returns `Sent` on the first transport that accepts the payload,
    /// `Queued` when neither is viable.
    pub async fn send(
        &self,
        record: &TokenTransferRecord,
        recipient: &PeerId,
    ) -> SendOutcome {
        match self.attempt_delivery(record, recipient).await {
            Some(kind) => SendOutcome::Sent(kind),
            None => {
                debug!(peer = %recipient, "no transport viable, queueing");
                self.outbox
                    .enqueue(record.token_payload.clone(), recipient.clone());
                SendOutcome::Queued
            }
        }
    }

    /// Broadcast an untargeted transfer over the mesh
    pub async fn broadcast(&self, record: &TokenTransferRecord) -> SendOutcome {
        let payload = match satchel_wire::encode(record) {
            Ok(payload) => payload,
            Err(e) => {
                return SendOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        match self.mesh.broadcast(payload).await {
            Ok(()) => SendOutcome::Sent(TransportKind::Mesh),
            Err(e) => SendOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Try mesh then relay; `None` means neither was viable
    ///
    /// Never queues; queueing is the caller's decision so a flush retry
    /// cannot re-enqueue its own entry.
    async fn attempt_delivery(
        &self,
        record: &TokenTransferRecord,
        recipient: &PeerId,
    ) -> Option<TransportKind> {
        // 1. mesh, preferred: infrastructure-free and lowest latency
        if self.mesh.is_peer_reachable(recipient) {
            match satchel_wire::encode(record) {
                Ok(payload) => match self.mesh.send_to_peer(recipient, payload).await {
                    Ok(()) => {
                        debug!(peer = %recipient, "sent over mesh");
                        return Some(TransportKind::Mesh);
                    }
                    Err(e) => {
                        warn!(peer = %recipient, error = %e, "mesh send failed, trying relay");
                    }
                },
                Err(e) => {
                    warn!(peer = %recipient, error = %e, "wire encode failed, trying relay");
                }
            }
        }

        // 2. relay, for mutual favorites with a known relay identity
        if let Some(relationship) = self.directory.relationship(recipient).await {
            if let Some(relay_identity) = relationship.relay_eligible() {
                let content = TokenTransferContent::new(
                    record.token_payload.clone(),
                    &self.wrapper.identity(),
                );
                let content_json = match serde_json::to_string(&content) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "could not serialize rumor content");
                        return None;
                    }
                };
                match self
                    .wrapper
                    .wrap_and_publish(&self.relay, &content_json, relay_identity)
                    .await
                {
                    Ok(wrap_id) => {
                        debug!(peer = %recipient, wrap_id = %wrap_id, "sent over relay");
                        return Some(TransportKind::Relay);
                    }
                    Err(e) => {
                        warn!(peer = %recipient, error = %e, "relay publish failed");
                    }
                }
            }
        }

        None
    }

    /// Retry queued sends for a peer that just became reachable
    ///
    /// Each entry is removed only when its own retry succeeds; a partial
    /// flush leaves the rest queued. Returns the number delivered.
    pub async fn flush(&self, peer: &PeerId) -> usize {
        let queued = self.outbox.for_peer(peer);
        if queued.is_empty() {
            return 0;
        }
        debug!(peer = %peer, count = queued.len(), "flushing outbox");

        let mut delivered = 0;
        for entry in queued {
            let record = self.requeue_record(&entry);
            if self.attempt_delivery(&record, peer).await.is_some() {
                self.outbox.remove(&entry);
                delivered += 1;
            }
        }
        delivered
    }

    /// Rebuild a minimal transfer record for a queued payload
    ///
    /// Only the token matters on retry; the surrounding metadata was
    /// not persisted with the queue entry.
    fn requeue_record(&self, entry: &QueuedSend) -> TokenTransferRecord {
        TokenTransferRecord::new(
            self.wrapper.identity(),
            self.our_peer.clone(),
            0,
            "sat",
            entry.token_payload.clone(),
            "",
        )
    }

    /// Number of sends queued for a peer
    pub fn queued_count(&self, peer: &PeerId) -> usize {
        self.outbox.count_for_peer(peer)
    }

    /// Snapshot of every queued send
    pub fn all_queued(&self) -> Vec<QueuedSend> {
        self.outbox.all()
    }

    /// Drop queued sends older than the retention window
    ///
    /// Expired entries are surfaced as `Failed { reason: "expired" }`
    /// and will never be delivered, even by a later flush.
    pub fn cleanup_expired(&self) -> Vec<(QueuedSend, SendOutcome)> {
        let cutoff = Utc::now() - self.config.outbox_retention();
        let expired = self.outbox.drain_older_than(cutoff);
        if !expired.is_empty() {
            debug!(count = expired.len(), "expired queued sends");
        }
        expired
            .into_iter()
            .map(|entry| {
                (
                    entry,
                    SendOutcome::Failed {
                        reason: "expired".to_string(),
                    },
                )
            })
            .collect()
    }

    /// Handle payload bytes arriving from the mesh transport
    ///
    /// Malformed payloads are dropped (`Ok(None)`); a decoded token is
    /// handed to the redemption collaborator, whose failure is the one
    /// delivery error surfaced to the user.
    pub async fn handle_mesh_payload(
        &self,
        from: &PeerId,
        payload: &[u8],
    ) -> SatchelResult<Option<TokenTransferRecord>> {
        let mut record = match satchel_wire::decode(payload) {
            Ok(record) => record,
            Err(e) => {
                debug!(peer = %from, error = %e, "dropping undecodable mesh payload");
                return Ok(None);
            }
        };
        let newly_claimed = self.redeemer.try_redeem(&record.token_payload).await?;
        if newly_claimed {
            record.mark_claimed(self.wrapper.identity().to_string(), Utc::now());
        }
        Ok(Some(record))
    }

    /// Handle a wrap event arriving on the relay subscription
    ///
    /// Runs the dedup-then-unwrap pipeline; duplicates, undecryptable
    /// wraps, and non-token content are dropped (`Ok(None)`).
    pub async fn handle_wrap_event(
        &self,
        event: &RelayEvent,
    ) -> SatchelResult<Option<TokenTransferContent>> {
        let Some(rumor) = self.wrapper.unwrap(event) else {
            return Ok(None);
        };
        let Some(content) = TokenTransferContent::parse(&rumor.content) else {
            debug!(rumor_id = %rumor.id, "rumor is not a token transfer");
            return Ok(None);
        };
        self.redeemer.try_redeem(&content.token).await?;
        self.window.mark_processed();
        Ok(Some(content))
    }

    /// Filter for subscribing to our wrap stream
    pub fn subscription_filter(&self) -> RelayFilter {
        self.window.wrap_filter(&self.wrapper.identity())
    }
}
