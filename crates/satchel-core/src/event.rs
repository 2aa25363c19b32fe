//! Signed events exchanged with the relay network
//!
//! The relay network stores and forwards JSON events. An event's id is
//! the hash of its canonical serialization (a fixed-order array of the
//! signable fields), and its signature covers the id. Three kinds are
//! used by the envelope protocol: the unsigned rumor (never transmitted
//! alone), the seal, and the gift wrap.

use crate::errors::{SatchelError, SatchelResult};
use crate::keys::IdentityKeypair;
use crate::types::IdentityKey;
use chrono::{DateTime, Utc};
use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event kind of the inner, unsigned payload record
pub const KIND_RUMOR: u16 = 14;
/// Event kind of the sender-signed, encrypted seal
pub const KIND_SEAL: u16 = 13;
/// Event kind of the ephemeral-signed, encrypted gift wrap
pub const KIND_GIFT_WRAP: u16 = 1059;

/// Hex-encoded event identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    /// Wrap an already-computed id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A relay-network event
///
/// `id` and `sig` are empty until [`RelayEvent::finalize`] computes the
/// id and [`RelayEvent::sign`] attaches a signature. Rumors stay
/// unsigned; seals and wraps are always signed before publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEvent {
    /// Hash of the canonical serialization
    pub id: String,
    /// Author identity (hex public key)
    pub pubkey: String,
    /// Event timestamp, seconds since epoch
    pub created_at: i64,
    /// Event kind
    pub kind: u16,
    /// Tag lists, e.g. `["p", <recipient identity>]`
    pub tags: Vec<Vec<String>>,
    /// Event body
    pub content: String,
    /// Hex signature over the id, empty for unsigned rumors
    pub sig: String,
}

impl RelayEvent {
    /// Build an unsigned event with empty id and signature
    pub fn build(
        kind: u16,
        pubkey: &IdentityKey,
        created_at: DateTime<Utc>,
        tags: Vec<Vec<String>>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            pubkey: pubkey.as_str().to_string(),
            created_at: created_at.timestamp(),
            kind,
            tags,
            content: content.into(),
            sig: String::new(),
        }
    }

    /// Canonical serialization: fixed-order array of the signable fields
    fn canonical_bytes(&self) -> SatchelResult<Vec<u8>> {
        let canonical = serde_json::json!([
            0,
            self.pubkey,
            self.created_at,
            self.kind,
            self.tags,
            self.content,
        ]);
        serde_json::to_vec(&canonical).map_err(SatchelError::from)
    }

    /// Compute and set the event id
    pub fn finalize(&mut self) -> SatchelResult<EventId> {
        let bytes = self.canonical_bytes()?;
        self.id = blake3::hash(&bytes).to_hex().to_string();
        Ok(EventId::new(self.id.clone()))
    }

    /// Compute the id and sign it with the given keypair
    ///
    /// The keypair's identity must match `pubkey`; signing with a
    /// mismatched key produces an event receivers will reject.
    pub fn sign(&mut self, keys: &IdentityKeypair) -> SatchelResult<EventId> {
        let id = self.finalize()?;
        let sig = keys.sign(self.id.as_bytes());
        self.sig = hex::encode(sig.to_bytes());
        Ok(id)
    }

    /// Verify the id matches the content and the signature matches the
    /// author
    pub fn verify(&self) -> SatchelResult<()> {
        let bytes = self.canonical_bytes()?;
        let expected = blake3::hash(&bytes).to_hex().to_string();
        if expected != self.id {
            return Err(SatchelError::crypto("event id does not match content"));
        }
        let sig_bytes = hex::decode(&self.sig)
            .map_err(|e| SatchelError::crypto(format!("malformed signature hex: {e}")))?;
        let sig_array = <[u8; 64]>::try_from(sig_bytes.as_slice())
            .map_err(|_| SatchelError::crypto("signature is not 64 bytes"))?;
        let signature = Signature::from_bytes(&sig_array);
        let identity = IdentityKey::new(self.pubkey.clone());
        if !IdentityKeypair::verify_with_identity(&identity, self.id.as_bytes(), &signature) {
            return Err(SatchelError::crypto("event signature invalid"));
        }
        Ok(())
    }

    /// First `["p", ...]` tag value, if any
    pub fn recipient_tag(&self) -> Option<IdentityKey> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some("p"))
            .and_then(|t| t.get(1))
            .map(|v| IdentityKey::new(v.clone()))
    }

    /// Author identity
    pub fn author(&self) -> IdentityKey {
        IdentityKey::new(self.pubkey.clone())
    }

    /// Event id, if finalized
    pub fn event_id(&self) -> Option<EventId> {
        if self.id.is_empty() {
            None
        } else {
            Some(EventId::new(self.id.clone()))
        }
    }
}

/// Subscription filter for relay events
///
/// Matches events by kind, recipient tag, and minimum timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFilter {
    /// Kinds to match
    pub kinds: Vec<u16>,
    /// Recipient identities to match against `["p", ...]` tags
    #[serde(rename = "#p")]
    pub p_tags: Vec<String>,
    /// Only events at or after this timestamp (seconds)
    pub since: i64,
}

impl RelayFilter {
    /// Whether an event matches this filter
    pub fn matches(&self, event: &RelayEvent) -> bool {
        if !self.kinds.contains(&event.kind) {
            return false;
        }
        if event.created_at < self.since {
            return false;
        }
        match event.recipient_tag() {
            Some(recipient) => self.p_tags.iter().any(|p| p == recipient.as_str()),
            None => self.p_tags.is_empty(),
        }
    }
}
