//! In-memory contact directory

use async_trait::async_trait;
use parking_lot::Mutex;
use satchel_core::{ContactDirectory, IdentityKey, PeerId, Relationship};
use std::collections::HashMap;

/// Directory double backed by a peer → relationship map
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    relationships: Mutex<HashMap<PeerId, Relationship>>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relationship for a peer
    pub fn set(&self, peer: PeerId, relationship: Relationship) {
        self.relationships.lock().insert(peer, relationship);
    }

    /// Register a mutual favorite with a known relay identity
    pub fn set_mutual(&self, peer: PeerId, relay_identity: IdentityKey) {
        self.set(
            peer,
            Relationship {
                is_favorite: true,
                they_favorited_us: true,
                relay_identity: Some(relay_identity),
            },
        );
    }
}

#[async_trait]
impl ContactDirectory for MemoryDirectory {
    async fn relationship(&self, peer: &PeerId) -> Option<Relationship> {
        self.relationships.lock().get(peer).cloned()
    }
}
