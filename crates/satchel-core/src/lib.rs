//! Core types and collaborator traits for the Satchel delivery subsystem
//!
//! Satchel moves opaque bearer tokens between peers over whichever
//! transport is currently viable: a short-range mesh transport when the
//! recipient is nearby, a store-and-forward relay network as fallback,
//! and a local outbox when neither is available. This crate holds the
//! pieces every other satchel crate shares:
//!
//! - the [`TokenTransferRecord`] data model and its [`DeliveryStatus`]
//!   state machine,
//! - the unified [`SatchelError`] type,
//! - effect traits for the external collaborators (mesh transport, relay
//!   client, contact directory, token redemption),
//! - the signed [`RelayEvent`] record exchanged with the relay network.
//!
//! Implementations of the effect traits live outside this workspace
//! (platform adapters) or in `satchel-testkit` (in-memory doubles).

pub mod config;
pub mod effects;
pub mod errors;
pub mod event;
pub mod keys;
pub mod transfer;
pub mod types;

pub use config::{CacheConfig, EnvelopeConfig, RouterConfig};
pub use effects::{ContactDirectory, EventHandler, MeshTransport, RelayClient, TokenRedeemer};
pub use errors::{PublishError, RedemptionError, SatchelError, SatchelResult, TransportError};
pub use event::{EventId, RelayEvent, RelayFilter, KIND_GIFT_WRAP, KIND_RUMOR, KIND_SEAL};
pub use keys::IdentityKeypair;
pub use transfer::{DeliveryStatus, QueuedSend, TokenTransferRecord};
pub use types::{IdentityKey, PeerId, Relationship};
