//! Gift-wrap construction and the unwrap pipeline

use crate::crypto::ConversationKey;
use crate::seen_cache::SeenCache;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use satchel_core::{
    EnvelopeConfig, EventId, IdentityKey, IdentityKeypair, RelayClient, RelayEvent, SatchelError,
    SatchelResult, KIND_GIFT_WRAP, KIND_RUMOR, KIND_SEAL,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Content type tag of a token-transfer rumor
pub const TOKEN_TRANSFER_TYPE: &str = "token_transfer";

/// JSON body of a token-transfer rumor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferContent {
    /// Content type discriminator, always [`TOKEN_TRANSFER_TYPE`]
    #[serde(rename = "type")]
    pub content_type: String,
    /// The bearer token being transferred (opaque)
    pub token: String,
    /// True send time, epoch milliseconds
    pub timestamp: i64,
    /// Sender's relay identity
    pub sender: String,
}

impl TokenTransferContent {
    /// Build a token-transfer body stamped now
    pub fn new(token: impl Into<String>, sender: &IdentityKey) -> Self {
        Self {
            content_type: TOKEN_TRANSFER_TYPE.to_string(),
            token: token.into(),
            timestamp: Utc::now().timestamp_millis(),
            sender: sender.as_str().to_string(),
        }
    }

    /// Parse a rumor body, accepting only token-transfer content
    pub fn parse(content: &str) -> Option<Self> {
        let parsed: Self = serde_json::from_str(content).ok()?;
        if parsed.content_type == TOKEN_TRANSFER_TYPE {
            Some(parsed)
        } else {
            None
        }
    }
}

/// Builds outbound gift wraps and unwraps inbound ones
///
/// Owns our identity keypair, the jitter policy, and the replay cache.
/// Publishing goes through the [`RelayClient`] collaborator; everything
/// else is local CPU work.
pub struct GiftWrapper {
    keys: IdentityKeypair,
    config: EnvelopeConfig,
    cache: Arc<SeenCache>,
}

impl GiftWrapper {
    /// Create a wrapper for our identity
    pub fn new(keys: IdentityKeypair, config: EnvelopeConfig, cache: Arc<SeenCache>) -> Self {
        Self {
            keys,
            config,
            cache,
        }
    }

    /// Our relay identity
    pub fn identity(&self) -> IdentityKey {
        self.keys.identity()
    }

    /// The replay cache backing the unwrap pipeline
    pub fn cache(&self) -> &Arc<SeenCache> {
        &self.cache
    }

    /// A timestamp backdated by up to the configured jitter window
    ///
    /// Applied independently to seal and wrap so the two cannot be
    /// correlated with each other or with the true send time.
    fn jittered_timestamp(&self) -> DateTime<Utc> {
        let jitter = rand::thread_rng().gen_range(0..=self.config.timestamp_jitter_secs);
        Utc::now() - Duration::seconds(jitter)
    }

    /// Build the inner rumor: unsigned, true timestamp
    fn build_rumor(&self, content: &str, recipient: &IdentityKey) -> SatchelResult<RelayEvent> {
        let mut rumor = RelayEvent::build(
            KIND_RUMOR,
            &self.keys.identity(),
            Utc::now(),
            vec![vec!["p".to_string(), recipient.as_str().to_string()]],
            content,
        );
        rumor.finalize()?;
        Ok(rumor)
    }

    /// Seal a rumor: encrypt to the recipient, sign with our real key
    fn seal_rumor(&self, rumor: &RelayEvent, recipient: &IdentityKey) -> SatchelResult<RelayEvent> {
        let conversation = ConversationKey::derive(&self.keys, recipient)
            .map_err(|e| SatchelError::crypto(e.to_string()))?;
        let ciphertext = conversation
            .encrypt(serde_json::to_string(rumor)?.as_bytes())
            .map_err(|e| SatchelError::crypto(e.to_string()))?;

        let mut seal = RelayEvent::build(
            KIND_SEAL,
            &self.keys.identity(),
            self.jittered_timestamp(),
            vec![],
            ciphertext,
        );
        seal.sign(&self.keys)?;
        Ok(seal)
    }

    /// Wrap a seal: encrypt to the recipient, sign with a fresh
    /// single-use keypair
    ///
    /// The ephemeral signing key zeroizes on drop at the end of this
    /// function and is never persisted or reused.
    fn wrap_seal(&self, seal: &RelayEvent, recipient: &IdentityKey) -> SatchelResult<RelayEvent> {
        let ephemeral = IdentityKeypair::generate();
        let conversation = ConversationKey::derive(&ephemeral, recipient)
            .map_err(|e| SatchelError::crypto(e.to_string()))?;
        let ciphertext = conversation
            .encrypt(serde_json::to_string(seal)?.as_bytes())
            .map_err(|e| SatchelError::crypto(e.to_string()))?;

        let mut wrap = RelayEvent::build(
            KIND_GIFT_WRAP,
            &ephemeral.identity(),
            self.jittered_timestamp(),
            vec![vec!["p".to_string(), recipient.as_str().to_string()]],
            ciphertext,
        );
        wrap.sign(&ephemeral)?;
        Ok(wrap)
    }

    /// Build the full three-layer envelope for a recipient
    pub fn wrap(&self, content: &str, recipient: &IdentityKey) -> SatchelResult<RelayEvent> {
        let rumor = self.build_rumor(content, recipient)?;
        let seal = self.seal_rumor(&rumor, recipient)?;
        self.wrap_seal(&seal, recipient)
    }

    /// Wrap and publish, returning the wrap's event id
    pub async fn wrap_and_publish<R: RelayClient>(
        &self,
        relay: &R,
        content: &str,
        recipient: &IdentityKey,
    ) -> SatchelResult<EventId> {
        let wrap = self.wrap(content, recipient)?;
        let id = wrap
            .event_id()
            .ok_or_else(|| SatchelError::internal("wrap has no id after signing"))?;
        relay.publish(wrap).await?;
        debug!(wrap_id = %id, recipient = %recipient, "published gift wrap");
        Ok(id)
    }

    /// Unwrap an inbound wrap event down to its rumor
    ///
    /// Returns `None` for duplicates and for anything malformed or
    /// undecryptable; a wrap whose outer layer cannot be decrypted is
    /// recorded as seen so it is never reprocessed (poison-pill
    /// protection). No failure here escapes to the subscription loop.
    pub fn unwrap(&self, wrap: &RelayEvent) -> Option<RelayEvent> {
        let wrap_id = match wrap.event_id() {
            Some(id) => id,
            None => {
                debug!("dropping wrap without an id");
                return None;
            }
        };
        if self.cache.seen(&wrap_id) {
            debug!(wrap_id = %wrap_id, "dropping already-seen wrap");
            return None;
        }

        let seal_json = match ConversationKey::derive(&self.keys, &wrap.author())
            .and_then(|key| key.decrypt(&wrap.content))
        {
            Ok(bytes) => bytes,
            Err(e) => {
                // never readable by us; remember it so redelivery is cheap
                warn!(wrap_id = %wrap_id, error = %e, "wrap layer failed, marking seen");
                self.cache.record(wrap_id, wrap.created_at);
                return None;
            }
        };

        let seal: RelayEvent = match serde_json::from_slice(&seal_json) {
            Ok(event) => event,
            Err(e) => {
                warn!(wrap_id = %wrap_id, error = %e, "seal does not parse, marking seen");
                self.cache.record(wrap_id, wrap.created_at);
                return None;
            }
        };
        if seal.kind != KIND_SEAL {
            warn!(wrap_id = %wrap_id, kind = seal.kind, "unexpected inner kind");
            return None;
        }
        if let Err(e) = seal.verify() {
            warn!(wrap_id = %wrap_id, error = %e, "seal signature invalid");
            return None;
        }

        let rumor_json = match ConversationKey::derive(&self.keys, &seal.author())
            .and_then(|key| key.decrypt(&seal.content))
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(wrap_id = %wrap_id, error = %e, "seal layer failed to decrypt");
                return None;
            }
        };

        let rumor: RelayEvent = match serde_json::from_slice(&rumor_json) {
            Ok(event) => event,
            Err(e) => {
                warn!(wrap_id = %wrap_id, error = %e, "rumor does not parse");
                return None;
            }
        };
        if rumor.kind != KIND_RUMOR {
            warn!(wrap_id = %wrap_id, kind = rumor.kind, "inner event is not a rumor");
            return None;
        }

        self.cache.record(wrap_id, wrap.created_at);
        Some(rumor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_core::CacheConfig;

    fn wrapper(keys: IdentityKeypair) -> GiftWrapper {
        GiftWrapper::new(
            keys,
            EnvelopeConfig::default(),
            Arc::new(SeenCache::new(CacheConfig::default())),
        )
    }

    #[test]
    fn wrap_then_unwrap_round_trip() {
        let sender = wrapper(IdentityKeypair::generate());
        let recipient_keys = IdentityKeypair::generate();
        let recipient = wrapper(recipient_keys.clone());

        let content = serde_json::to_string(&TokenTransferContent::new(
            "cashuAbc",
            &sender.identity(),
        ))
        .expect("serialize");
        let wrap = sender
            .wrap(&content, &recipient_keys.identity())
            .expect("wrap");

        // relays see only the ephemeral author and the recipient tag
        assert_eq!(wrap.kind, KIND_GIFT_WRAP);
        assert_ne!(wrap.author(), sender.identity());
        assert_eq!(wrap.recipient_tag(), Some(recipient_keys.identity()));

        let rumor = recipient.unwrap(&wrap).expect("unwrap");
        assert_eq!(rumor.kind, KIND_RUMOR);
        assert_eq!(rumor.author(), sender.identity());
        let parsed = TokenTransferContent::parse(&rumor.content).expect("content");
        assert_eq!(parsed.token, "cashuAbc");
    }

    #[test]
    fn duplicate_wrap_yields_one_rumor() {
        let sender = wrapper(IdentityKeypair::generate());
        let recipient_keys = IdentityKeypair::generate();
        let recipient = wrapper(recipient_keys.clone());

        let wrap = sender
            .wrap("{\"type\":\"token_transfer\",\"token\":\"t\",\"timestamp\":0,\"sender\":\"s\"}", &recipient_keys.identity())
            .expect("wrap");

        assert!(recipient.unwrap(&wrap).is_some());
        assert!(recipient.unwrap(&wrap).is_none());
        assert_eq!(recipient.cache().len(), 1);
    }

    #[test]
    fn wrap_for_a_does_not_open_for_b() {
        let sender = wrapper(IdentityKeypair::generate());
        let a = IdentityKeypair::generate();
        let b = wrapper(IdentityKeypair::generate());

        let wrap = sender.wrap("secret", &a.identity()).expect("wrap");
        assert!(b.unwrap(&wrap).is_none());
        // poison-pill: recorded so the relay's redelivery is dropped fast
        assert_eq!(b.cache().len(), 1);
    }

    #[test]
    fn garbage_content_is_dropped_not_fatal() {
        let recipient = wrapper(IdentityKeypair::generate());
        let ephemeral = IdentityKeypair::generate();
        let mut bogus = RelayEvent::build(
            KIND_GIFT_WRAP,
            &ephemeral.identity(),
            Utc::now(),
            vec![vec!["p".to_string(), recipient.identity().to_string()]],
            "definitely not ciphertext",
        );
        bogus.sign(&ephemeral).expect("sign");

        assert!(recipient.unwrap(&bogus).is_none());
        // still processes the next, valid wrap
        let sender = wrapper(IdentityKeypair::generate());
        let good = sender
            .wrap("after the poison pill", &recipient.identity())
            .expect("wrap");
        assert!(recipient.unwrap(&good).is_some());
    }

    #[test]
    fn seal_and_wrap_timestamps_are_jittered_into_the_past() {
        let sender = wrapper(IdentityKeypair::generate());
        let recipient_keys = IdentityKeypair::generate();
        let recipient = wrapper(recipient_keys.clone());

        let before = Utc::now().timestamp();
        let wrap = sender.wrap("jitter", &recipient_keys.identity()).expect("wrap");
        let after = Utc::now().timestamp();

        let window = EnvelopeConfig::default().timestamp_jitter_secs;
        assert!(wrap.created_at <= after);
        assert!(wrap.created_at >= before - window);

        let rumor = recipient.unwrap(&wrap).expect("unwrap");
        // the rumor carries the true time
        assert!(rumor.created_at >= before && rumor.created_at <= after);
    }

    #[test]
    fn ephemeral_keys_are_unique_per_wrap() {
        let sender = wrapper(IdentityKeypair::generate());
        let recipient = IdentityKeypair::generate();

        let w1 = sender.wrap("one", &recipient.identity()).expect("wrap");
        let w2 = sender.wrap("two", &recipient.identity()).expect("wrap");
        assert_ne!(w1.author(), w2.author());
        assert_ne!(w1.author(), sender.identity());
    }

    #[test]
    fn non_token_content_parse_returns_none() {
        assert!(TokenTransferContent::parse("{\"type\":\"chat\",\"token\":\"x\",\"timestamp\":0,\"sender\":\"s\"}").is_none());
        assert!(TokenTransferContent::parse("not json").is_none());
    }
}
