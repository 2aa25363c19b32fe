//! Effect traits for the external collaborators
//!
//! The delivery subsystem treats its surroundings as four capabilities:
//! the short-range mesh transport, the relay-network client, the contact
//! directory, and token redemption. Platform adapters implement these
//! traits outside this workspace; `satchel-testkit` provides in-memory
//! doubles.
//!
//! The mesh and relay calls may suspend (radio and network I/O) and are
//! async; the directory and redemption calls are async for the same
//! reason on some platforms. None of them may be called while a satchel
//! lock is held.

use crate::errors::{PublishError, RedemptionError, TransportError};
use crate::event::{RelayEvent, RelayFilter};
use crate::types::{PeerId, Relationship};
use async_trait::async_trait;
use std::sync::Arc;

/// Handler invoked for every event delivered on a relay subscription
pub type EventHandler = Arc<dyn Fn(RelayEvent) + Send + Sync>;

/// Short-range mesh transport
///
/// Discovery, pairing, multi-hop relay, and outer packet framing are the
/// transport's own concern; satchel only hands it already-encoded payload
/// bytes and receives demultiplexed payload bytes back.
#[async_trait]
pub trait MeshTransport: Send + Sync {
    /// Send payload bytes to a specific peer
    async fn send_to_peer(&self, peer: &PeerId, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Broadcast payload bytes to all reachable peers
    async fn broadcast(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Whether a peer is currently reachable over the mesh
    fn is_peer_reachable(&self, peer: &PeerId) -> bool;
}

/// Relay-network client
///
/// Connection pooling across relay endpoints and key management are the
/// client's concern; satchel publishes finished, signed events and
/// registers a handler for inbound ones.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Publish a signed event to the relay network
    async fn publish(&self, event: RelayEvent) -> Result<(), PublishError>;

    /// Register a handler for events matching the filter
    ///
    /// Delivery is at-least-once; callers deduplicate.
    async fn subscribe(&self, filter: RelayFilter, handler: EventHandler)
        -> Result<(), PublishError>;
}

/// Contact directory: who do we trust, and how can we reach them off-mesh
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Relationship with a peer, if any is on file
    async fn relationship(&self, peer: &PeerId) -> Option<Relationship>;
}

/// Token redemption collaborator
///
/// Decodes the bearer token, contacts its issuing authority, and detects
/// double-spends. Must be idempotent: redeeming the same token twice
/// returns `Ok(false)` the second time rather than an error, which is
/// what makes cross-transport duplicate delivery harmless.
#[async_trait]
pub trait TokenRedeemer: Send + Sync {
    /// Attempt to redeem a bearer token; `Ok(true)` if newly claimed
    async fn try_redeem(&self, token_payload: &str) -> Result<bool, RedemptionError>;
}

#[async_trait]
impl<T: MeshTransport + ?Sized> MeshTransport for Arc<T> {
    async fn send_to_peer(&self, peer: &PeerId, payload: Vec<u8>) -> Result<(), TransportError> {
        (**self).send_to_peer(peer, payload).await
    }

    async fn broadcast(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        (**self).broadcast(payload).await
    }

    fn is_peer_reachable(&self, peer: &PeerId) -> bool {
        (**self).is_peer_reachable(peer)
    }
}

#[async_trait]
impl<T: RelayClient + ?Sized> RelayClient for Arc<T> {
    async fn publish(&self, event: RelayEvent) -> Result<(), PublishError> {
        (**self).publish(event).await
    }

    async fn subscribe(
        &self,
        filter: RelayFilter,
        handler: EventHandler,
    ) -> Result<(), PublishError> {
        (**self).subscribe(filter, handler).await
    }
}

#[async_trait]
impl<T: ContactDirectory + ?Sized> ContactDirectory for Arc<T> {
    async fn relationship(&self, peer: &PeerId) -> Option<Relationship> {
        (**self).relationship(peer).await
    }
}

#[async_trait]
impl<T: TokenRedeemer + ?Sized> TokenRedeemer for Arc<T> {
    async fn try_redeem(&self, token_payload: &str) -> Result<bool, RedemptionError> {
        (**self).try_redeem(token_payload).await
    }
}
