//! In-memory mesh transport

use async_trait::async_trait;
use parking_lot::Mutex;
use satchel_core::{MeshTransport, PeerId, TransportError};
use std::collections::HashSet;

/// Mesh double with a configurable reachable set and a send log
#[derive(Debug, Default)]
pub struct MemoryMesh {
    reachable: Mutex<HashSet<PeerId>>,
    fail_sends: Mutex<HashSet<PeerId>>,
    sent: Mutex<Vec<(PeerId, Vec<u8>)>>,
    broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl MemoryMesh {
    /// Create a mesh with no reachable peers
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a peer reachable
    pub fn add_reachable(&self, peer: PeerId) {
        self.reachable.lock().insert(peer);
    }

    /// Mark a peer unreachable
    pub fn remove_reachable(&self, peer: &PeerId) {
        self.reachable.lock().remove(peer);
    }

    /// Make sends to a peer fail even though it is reachable
    pub fn fail_sends_to(&self, peer: PeerId) {
        self.fail_sends.lock().insert(peer);
    }

    /// Payloads sent to specific peers, in order
    pub fn sent(&self) -> Vec<(PeerId, Vec<u8>)> {
        self.sent.lock().clone()
    }

    /// Broadcast payloads, in order
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().clone()
    }

    /// Number of targeted sends
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl MeshTransport for MemoryMesh {
    async fn send_to_peer(&self, peer: &PeerId, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.fail_sends.lock().contains(peer) {
            return Err(TransportError::SendFailed {
                peer: peer.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        if !self.reachable.lock().contains(peer) {
            return Err(TransportError::SendFailed {
                peer: peer.to_string(),
                reason: "peer not reachable".to_string(),
            });
        }
        self.sent.lock().push((peer.clone(), payload));
        Ok(())
    }

    async fn broadcast(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.broadcasts.lock().push(payload);
        Ok(())
    }

    fn is_peer_reachable(&self, peer: &PeerId) -> bool {
        self.reachable.lock().contains(peer)
    }
}
