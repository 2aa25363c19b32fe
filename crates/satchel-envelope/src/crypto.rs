//! Conversation keys and envelope content encryption
//!
//! Each envelope layer is encrypted under a conversation key derived
//! from one side's secret and the other side's public identity. The
//! ed25519 identities are converted to their x25519 form for the
//! Diffie-Hellman step, so both sides derive the same key; the shared
//! secret is then run through HKDF-SHA256 with a fixed context salt.
//!
//! Content encryption is ChaCha20-Poly1305 with a random 12-byte nonce;
//! the wire form is `base64(nonce || ciphertext)`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use ed25519_dalek::hazmat::ExpandedSecretKey;
use ed25519_dalek::VerifyingKey;
use hkdf::Hkdf;
use rand_core::OsRng;
use satchel_core::{IdentityKey, IdentityKeypair};
use sha2::Sha256;
use zeroize::Zeroize;

/// HKDF context salt pinning the derivation to this protocol version
const CONVERSATION_SALT: &[u8] = b"satchel-conversation-v1";

/// Nonce length of ChaCha20-Poly1305
const NONCE_LEN: usize = 12;

/// Envelope-layer cryptographic failure
///
/// Never surfaced to the user; the receive pipeline logs and drops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// The peer identity is not a valid public key encoding
    #[error("invalid peer identity: {0}")]
    InvalidPeerIdentity(String),
    /// Encryption failed
    #[error("encryption failed")]
    EncryptFailed,
    /// Decryption or authentication failed
    #[error("decryption failed")]
    DecryptFailed,
    /// The payload is not valid base64 or too short to hold a nonce
    #[error("malformed ciphertext payload")]
    MalformedPayload,
}

/// Symmetric key shared by exactly one pair of identities
///
/// Derivation is symmetric: `derive(a_secret, b_public)` equals
/// `derive(b_secret, a_public)`.
pub struct ConversationKey {
    key: [u8; 32],
}

impl ConversationKey {
    /// Derive the conversation key between our keypair and a peer
    pub fn derive(ours: &IdentityKeypair, peer: &IdentityKey) -> Result<Self, CryptoError> {
        let peer_bytes = peer
            .to_bytes()
            .and_then(|b| <[u8; 32]>::try_from(b.as_slice()).ok())
            .ok_or_else(|| CryptoError::InvalidPeerIdentity(peer.to_string()))?;
        let peer_key = VerifyingKey::from_bytes(&peer_bytes)
            .map_err(|_| CryptoError::InvalidPeerIdentity(peer.to_string()))?;

        // ed25519 -> x25519: clamp our scalar, map their point to
        // Montgomery form, then a regular DH exchange
        let secret = ours.secret_bytes();
        let expanded = ExpandedSecretKey::from(&secret);
        let mut shared = (peer_key.to_montgomery() * expanded.scalar).to_bytes();

        let hk = Hkdf::<Sha256>::new(Some(CONVERSATION_SALT), &shared);
        shared.zeroize();

        let mut key = [0u8; 32];
        hk.expand(&[], &mut key)
            .map_err(|_| CryptoError::EncryptFailed)?;
        Ok(Self { key })
    }

    /// Encrypt a payload, returning `base64(nonce || ciphertext)`
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, CryptoError> {
        let cipher = ChaCha20Poly1305::new((&self.key).into());
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::EncryptFailed)?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(payload))
    }

    /// Decrypt a `base64(nonce || ciphertext)` payload
    pub fn decrypt(&self, payload: &str) -> Result<Vec<u8>, CryptoError> {
        let bytes = BASE64
            .decode(payload)
            .map_err(|_| CryptoError::MalformedPayload)?;
        if bytes.len() < NONCE_LEN {
            return Err(CryptoError::MalformedPayload);
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new((&self.key).into());
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptFailed)
    }
}

impl Drop for ConversationKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
