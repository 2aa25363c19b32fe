//! Identifier newtypes and the contact relationship record

use serde::{Deserialize, Serialize};
use std::fmt;

/// Short-range transport address of a peer (opaque, 16-char hex in
/// practice)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer id from its transport address string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// Relay-network public identity (hex-encoded public key)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Create an identity from its hex encoding
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw identity bytes, if the encoding is valid hex
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        hex::decode(&self.0).ok()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for IdentityKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Trust relationship with a peer, as reported by the contact directory
///
/// Relay fallback is gated on a mutual relationship with a known relay
/// identity: both sides must have favorited each other and the peer's
/// relay identity must be on file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// We favorited them
    pub is_favorite: bool,
    /// They favorited us
    pub they_favorited_us: bool,
    /// The peer's relay-network identity, if known
    pub relay_identity: Option<IdentityKey>,
}

impl Relationship {
    /// Whether the relationship is bidirectional
    pub fn is_mutual(&self) -> bool {
        self.is_favorite && self.they_favorited_us
    }

    /// Whether this peer is eligible for relay fallback
    pub fn relay_eligible(&self) -> Option<&IdentityKey> {
        if self.is_mutual() {
            self.relay_identity.as_ref()
        } else {
            None
        }
    }
}
