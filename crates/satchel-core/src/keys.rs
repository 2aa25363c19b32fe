//! Identity keypairs for relay-network event signing

use crate::types::IdentityKey;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// An ed25519 keypair identifying a party on the relay network
///
/// Holds both halves; the public half doubles as the party's
/// [`IdentityKey`] (hex-encoded). Ephemeral wrap keypairs are also this
/// type, generated fresh per message and dropped after signing.
#[derive(Clone)]
pub struct IdentityKeypair {
    signing: SigningKey,
}

impl std::fmt::Debug for IdentityKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the secret half
        f.debug_struct("IdentityKeypair")
            .field("identity", &self.identity().as_str())
            .finish()
    }
}

impl IdentityKeypair {
    /// Generate a fresh keypair from the system RNG
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Reconstruct a keypair from its 32-byte secret
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(bytes),
        }
    }

    /// The 32-byte secret
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.signing.to_bytes()
    }

    /// The public half as a relay identity (hex)
    pub fn identity(&self) -> IdentityKey {
        IdentityKey::new(hex::encode(self.signing.verifying_key().to_bytes()))
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing.sign(message)
    }

    /// Verify a signature against an identity's public key
    pub fn verify_with_identity(
        identity: &IdentityKey,
        message: &[u8],
        signature: &Signature,
    ) -> bool {
        let Some(bytes) = identity.to_bytes() else {
            return false;
        };
        let Ok(key_bytes) = <[u8; 32]>::try_from(bytes.as_slice()) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        key.verify(message, signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let keys = IdentityKeypair::generate();
        let sig = keys.sign(b"hello");
        assert!(IdentityKeypair::verify_with_identity(
            &keys.identity(),
            b"hello",
            &sig
        ));
        assert!(!IdentityKeypair::verify_with_identity(
            &keys.identity(),
            b"tampered",
            &sig
        ));
    }

    #[test]
    fn identity_is_64_hex_chars() {
        let keys = IdentityKeypair::generate();
        assert_eq!(keys.identity().as_str().len(), 64);
    }

    #[test]
    fn wrong_identity_rejects() {
        let a = IdentityKeypair::generate();
        let b = IdentityKeypair::generate();
        let sig = a.sign(b"hello");
        assert!(!IdentityKeypair::verify_with_identity(
            &b.identity(),
            b"hello",
            &sig
        ));
    }
}
