//! The token transfer record and its delivery-status state machine

use crate::types::{IdentityKey, PeerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery status of a token transfer
///
/// Transitions are one-directional: a record never re-enters `Sending`.
/// `Claimed` is independent of the delivery path and may be reached from
/// any non-failed state once redemption succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Send attempt in progress
    Sending,
    /// Accepted by a transport (mesh ack or relay publish ack)
    Sent,
    /// Confirmed received by the recipient
    Delivered {
        /// Who confirmed receipt
        to: String,
        /// When receipt was confirmed
        at: DateTime<Utc>,
    },
    /// Seen by the recipient
    Read {
        /// Who read it
        by: String,
        /// When it was read
        at: DateTime<Utc>,
    },
    /// Redeemed with the issuing authority
    Claimed {
        /// Who claimed it
        by: String,
        /// When it was claimed
        at: DateTime<Utc>,
    },
    /// Delivery gave up
    Failed {
        /// Why delivery failed
        reason: String,
    },
    /// Broadcast reached only part of the audience
    PartiallyDelivered {
        /// Peers reached
        reached: u32,
        /// Peers targeted
        total: u32,
    },
}

impl DeliveryStatus {
    /// Fixed human-readable string for each status
    ///
    /// Pure mapping for UI collaborators; no side effects.
    pub fn display_text(&self) -> String {
        match self {
            Self::Sending => "Sending...".to_string(),
            Self::Sent => "Sent".to_string(),
            Self::Delivered { to, .. } => format!("Delivered to {to}"),
            Self::Read { by, .. } => format!("Read by {by}"),
            Self::Claimed { by, .. } => format!("Claimed by {by}"),
            Self::Failed { reason } => format!("Failed: {reason}"),
            Self::PartiallyDelivered { reached, total } => {
                format!("Delivered to {reached}/{total}")
            }
        }
    }

    /// Whether `next` is a legal successor of this status
    ///
    /// Encodes the one-directional state machine: `Sending` is never
    /// re-entered, terminal failures stay failed, and claiming is always
    /// allowed until the transfer has failed.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        match (self, next) {
            // nothing re-enters Sending
            (_, Self::Sending) => false,
            // claiming can race with Sent/Delivered/Read
            (Self::Failed { .. }, Self::Claimed { .. }) => false,
            (_, Self::Claimed { .. }) => true,
            (Self::Sending, _) => true,
            (Self::Sent, Self::Delivered { .. })
            | (Self::Sent, Self::Failed { .. })
            | (Self::Sent, Self::PartiallyDelivered { .. })
            | (Self::Delivered { .. }, Self::Read { .. })
            | (Self::PartiallyDelivered { .. }, Self::Delivered { .. }) => true,
            _ => false,
        }
    }
}

/// A bearer-token transfer being moved between two parties
///
/// The `token_payload` is opaque: satchel passes it through unchanged and
/// never inspects its internal structure. `id` is assigned once at
/// creation and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferRecord {
    /// Unique transfer id (uppercase uuid-v4)
    pub id: String,
    /// Sender's relay-network identity
    pub sender_identity: IdentityKey,
    /// Sender's short-range transport address
    pub sender_transport_id: PeerId,
    /// True creation time, millisecond precision
    pub created_at: DateTime<Utc>,
    /// Amount in base units
    pub amount: u32,
    /// Unit of the amount, e.g. "sat"
    pub unit: String,
    /// The bearer token itself (opaque)
    pub token_payload: String,
    /// URL of the token's issuing authority
    pub issuer_url: String,
    /// Optional note attached by the sender
    pub memo: Option<String>,
    /// Whether the token has been redeemed; monotonic once true
    pub claimed: bool,
    /// Current delivery status (not carried on the wire)
    pub delivery_status: DeliveryStatus,
    /// Target identity for private transfers; absent means broadcast
    pub recipient_identity: Option<IdentityKey>,
}

impl TokenTransferRecord {
    /// Create a new transfer with a fresh id and `Sending` status
    pub fn new(
        sender_identity: IdentityKey,
        sender_transport_id: PeerId,
        amount: u32,
        unit: impl Into<String>,
        token_payload: impl Into<String>,
        issuer_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string().to_uppercase(),
            sender_identity,
            sender_transport_id,
            created_at: Utc::now(),
            amount,
            unit: unit.into(),
            token_payload: token_payload.into(),
            issuer_url: issuer_url.into(),
            memo: None,
            claimed: false,
            delivery_status: DeliveryStatus::Sending,
            recipient_identity: None,
        }
    }

    /// Attach a memo
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Target a specific recipient identity
    pub fn with_recipient(mut self, recipient: IdentityKey) -> Self {
        self.recipient_identity = Some(recipient);
        self
    }

    /// Mark the token claimed; idempotent and never un-claims
    pub fn mark_claimed(&mut self, by: impl Into<String>, at: DateTime<Utc>) {
        self.claimed = true;
        let next = DeliveryStatus::Claimed {
            by: by.into(),
            at,
        };
        if self.delivery_status.can_transition_to(&next) {
            self.delivery_status = next;
        }
    }

    /// Apply a status transition if the state machine allows it
    ///
    /// Returns whether the transition was applied.
    pub fn update_status(&mut self, next: DeliveryStatus) -> bool {
        if self.delivery_status.can_transition_to(&next) {
            self.delivery_status = next;
            true
        } else {
            false
        }
    }
}

/// A send that could not be delivered on either live transport
///
/// Created when both the mesh and relay paths were unavailable; destroyed
/// when a later flush succeeds or when older than the retention window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedSend {
    /// The bearer token awaiting delivery
    pub token_payload: String,
    /// The transport address of the intended recipient
    pub recipient_transport_id: PeerId,
    /// When the send was queued
    pub enqueued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TokenTransferRecord {
        TokenTransferRecord::new(
            IdentityKey::from("npub1xyz"),
            PeerId::from("a1b2c3d4e5f60718"),
            100,
            "sat",
            "cashuAeyJ0b2tlbiI6W119",
            "https://mint.example.com",
        )
    }

    #[test]
    fn fresh_record_is_sending_with_uppercase_id() {
        let r = record();
        assert_eq!(r.delivery_status, DeliveryStatus::Sending);
        assert_eq!(r.id, r.id.to_uppercase());
        assert!(!r.claimed);
    }

    #[test]
    fn claimed_is_monotonic() {
        let mut r = record();
        r.mark_claimed("npub1abc", Utc::now());
        assert!(r.claimed);
        // a later failed transition must not reset the claim
        assert!(!r.update_status(DeliveryStatus::Sending));
        assert!(r.claimed);
    }

    #[test]
    fn sending_is_never_reentered() {
        let mut r = record();
        assert!(r.update_status(DeliveryStatus::Sent));
        assert!(!r.update_status(DeliveryStatus::Sending));
        assert_eq!(r.delivery_status, DeliveryStatus::Sent);
    }

    #[test]
    fn claim_races_past_delivered() {
        let mut r = record();
        r.update_status(DeliveryStatus::Sent);
        r.update_status(DeliveryStatus::Delivered {
            to: "peer".into(),
            at: Utc::now(),
        });
        assert!(r.update_status(DeliveryStatus::Claimed {
            by: "peer".into(),
            at: Utc::now(),
        }));
    }

    #[test]
    fn failed_cannot_be_claimed() {
        let mut r = record();
        r.update_status(DeliveryStatus::Failed {
            reason: "expired".into(),
        });
        assert!(!r.update_status(DeliveryStatus::Claimed {
            by: "peer".into(),
            at: Utc::now(),
        }));
    }

    #[test]
    fn display_text_mapping() {
        assert_eq!(DeliveryStatus::Sending.display_text(), "Sending...");
        assert_eq!(DeliveryStatus::Sent.display_text(), "Sent");
        assert_eq!(
            DeliveryStatus::Failed {
                reason: "expired".into()
            }
            .display_text(),
            "Failed: expired"
        );
        assert_eq!(
            DeliveryStatus::PartiallyDelivered {
                reached: 2,
                total: 5
            }
            .display_text(),
            "Delivered to 2/5"
        );
    }
}
