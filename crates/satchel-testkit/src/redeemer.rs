//! In-memory token redeemer

use async_trait::async_trait;
use parking_lot::Mutex;
use satchel_core::{RedemptionError, TokenRedeemer};
use std::collections::HashSet;

/// Redeemer double that is idempotent by construction
///
/// Redeeming a token it has already seen returns `Ok(false)`, which is
/// the contract the router relies on for cross-transport duplicate
/// suppression.
#[derive(Debug, Default)]
pub struct MemoryRedeemer {
    redeemed: Mutex<Vec<String>>,
    seen: Mutex<HashSet<String>>,
    fail_with: Mutex<Option<String>>,
}

impl MemoryRedeemer {
    /// Create a redeemer that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Make all redemptions fail with the given reason
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.fail_with.lock() = Some(reason.into());
    }

    /// Tokens redeemed, in order, first sighting only
    pub fn redeemed(&self) -> Vec<String> {
        self.redeemed.lock().clone()
    }
}

#[async_trait]
impl TokenRedeemer for MemoryRedeemer {
    async fn try_redeem(&self, token_payload: &str) -> Result<bool, RedemptionError> {
        if let Some(reason) = self.fail_with.lock().clone() {
            return Err(RedemptionError::new(reason));
        }
        if !self.seen.lock().insert(token_payload.to_string()) {
            // already claimed; idempotent, not an error
            return Ok(false);
        }
        self.redeemed.lock().push(token_payload.to_string());
        Ok(true)
    }
}
