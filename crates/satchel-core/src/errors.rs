//! Unified error system for satchel crates
//!
//! A single error type with constructor helpers covers every failure the
//! delivery subsystem can surface. The transport-specific errors that
//! drive the router's fallback chain ([`TransportError`],
//! [`PublishError`], [`RedemptionError`]) are separate enums so callers
//! can match on them at the boundary; all of them convert into
//! [`SatchelError`] for propagation.

use serde::{Deserialize, Serialize};

/// Result alias used across satchel crates
pub type SatchelResult<T> = Result<T, SatchelError>;

/// Unified error type for all satchel operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum SatchelError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Description of the invalid input
        message: String,
    },

    /// Cryptographic operation failed
    #[error("Crypto error: {message}")]
    Crypto {
        /// Description of the cryptographic failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure
        message: String,
    },

    /// Mesh transport send or broadcast failed
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure
        message: String,
    },

    /// Relay publish failed
    #[error("Publish error: {message}")]
    Publish {
        /// Description of the publish failure
        message: String,
    },

    /// Token redemption failed
    #[error("Redemption error: {message}")]
    Redemption {
        /// Description of the redemption failure
        message: String,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

impl SatchelError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a publish error
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish {
            message: message.into(),
        }
    }

    /// Create a redemption error
    pub fn redemption(message: impl Into<String>) -> Self {
        Self::Redemption {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Mesh transport failure
///
/// Triggers the router's fallback to the relay transport; never surfaced
/// to the user directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TransportError {
    /// Targeted send to a peer failed
    #[error("send to {peer} failed: {reason}")]
    SendFailed {
        /// The peer the send targeted
        peer: String,
        /// Reason for the failure
        reason: String,
    },
    /// Broadcast to all reachable peers failed
    #[error("broadcast failed: {reason}")]
    BroadcastFailed {
        /// Reason for the failure
        reason: String,
    },
}

/// Relay publish failure
///
/// Triggers queueing to the router's outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("publish failed: {reason}")]
pub struct PublishError {
    /// Reason the relay rejected or failed the publish
    pub reason: String,
}

impl PublishError {
    /// Create a publish error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Token redemption failure, propagated from the redemption collaborator
///
/// The only delivery-path error that is user-visible ("could not claim").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("could not claim: {reason}")]
pub struct RedemptionError {
    /// Reason redemption failed
    pub reason: String,
}

impl RedemptionError {
    /// Create a redemption error
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl From<TransportError> for SatchelError {
    fn from(err: TransportError) -> Self {
        Self::transport(err.to_string())
    }
}

impl From<PublishError> for SatchelError {
    fn from(err: PublishError) -> Self {
        Self::publish(err.reason)
    }
}

impl From<RedemptionError> for SatchelError {
    fn from(err: RedemptionError) -> Self {
        Self::redemption(err.reason)
    }
}

impl From<serde_json::Error> for SatchelError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
