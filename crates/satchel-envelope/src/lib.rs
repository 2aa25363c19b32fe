//! Three-layer envelope protocol for the relay transport
//!
//! When a token has to cross the public relay network, its metadata is
//! as sensitive as its content: relay operators must learn neither the
//! true sender nor the true send time. The envelope protocol hides both
//! with three nested records:
//!
//! 1. **Rumor** — the unsigned payload event, carrying the true
//!    timestamp. Never transmitted on its own.
//! 2. **Seal** — the serialized rumor, encrypted to the recipient and
//!    signed by the sender's real identity, with a backdated timestamp.
//! 3. **Wrap** — the serialized seal, encrypted to the recipient and
//!    signed by a single-use ephemeral keypair, also backdated. Only the
//!    wrap is published; only its `["p", recipient]` tag is visible to
//!    relays.
//!
//! The receive side runs the same pipeline in reverse behind a replay
//! cache, and treats every cryptographic or parse failure as non-fatal:
//! a hostile envelope is dropped, never allowed to stall the
//! subscription loop.

pub mod crypto;
pub mod gift_wrap;
pub mod seen_cache;
pub mod subscription;

pub use crypto::{ConversationKey, CryptoError};
pub use gift_wrap::{GiftWrapper, TokenTransferContent, TOKEN_TRANSFER_TYPE};
pub use seen_cache::SeenCache;
pub use subscription::SubscriptionWindow;
