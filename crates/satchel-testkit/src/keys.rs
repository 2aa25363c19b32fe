//! Deterministic test keypairs

use satchel_core::IdentityKeypair;

/// Keypair derived from a single seed byte, stable across runs
pub fn keypair(seed: u8) -> IdentityKeypair {
    IdentityKeypair::from_secret_bytes(&[seed; 32])
}

/// A (sender, recipient) pair that never collides
pub fn sender_and_recipient() -> (IdentityKeypair, IdentityKeypair) {
    (keypair(0x11), keypair(0x22))
}
