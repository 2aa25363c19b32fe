//! Router policy-chain and outbox behavior against in-memory collaborators

use assert_matches::assert_matches;
use satchel_core::{
    CacheConfig, EnvelopeConfig, IdentityKey, IdentityKeypair, PeerId, RouterConfig,
    TokenTransferRecord, KIND_GIFT_WRAP,
};
use satchel_envelope::{GiftWrapper, SeenCache, SubscriptionWindow};
use satchel_router::{SendOutcome, TransportKind, TransportRouter};
use satchel_testkit::keys::sender_and_recipient;
use satchel_testkit::{MemoryDirectory, MemoryMesh, MemoryRedeemer, MemoryRelay};
use std::sync::Arc;

type TestRouter = TransportRouter<
    Arc<MemoryMesh>,
    Arc<MemoryRelay>,
    Arc<MemoryDirectory>,
    Arc<MemoryRedeemer>,
>;

struct Fixture {
    mesh: Arc<MemoryMesh>,
    relay: Arc<MemoryRelay>,
    directory: Arc<MemoryDirectory>,
    redeemer: Arc<MemoryRedeemer>,
    router: TestRouter,
    keys: IdentityKeypair,
}

fn fixture_with_config(config: RouterConfig) -> Fixture {
    let mesh = Arc::new(MemoryMesh::new());
    let relay = Arc::new(MemoryRelay::new());
    let directory = Arc::new(MemoryDirectory::new());
    let redeemer = Arc::new(MemoryRedeemer::new());
    let (keys, _) = sender_and_recipient();
    let wrapper = GiftWrapper::new(
        keys.clone(),
        EnvelopeConfig::default(),
        Arc::new(SeenCache::new(CacheConfig::default())),
    );
    let router = TransportRouter::new(
        Arc::clone(&mesh),
        Arc::clone(&relay),
        Arc::clone(&directory),
        Arc::clone(&redeemer),
        wrapper,
        SubscriptionWindow::new(EnvelopeConfig::default()),
        PeerId::from("0011223344556677"),
        config,
    );
    Fixture {
        mesh,
        relay,
        directory,
        redeemer,
        router,
        keys,
    }
}

fn fixture() -> Fixture {
    fixture_with_config(RouterConfig::default())
}

fn recipient_peer() -> PeerId {
    PeerId::from("8899aabbccddeeff")
}

fn recipient_keys() -> IdentityKeypair {
    sender_and_recipient().1
}

fn record(fx: &Fixture) -> TokenTransferRecord {
    TokenTransferRecord::new(
        fx.keys.identity(),
        PeerId::from("0011223344556677"),
        100,
        "sat",
        "cashuAeyJ0b2tlbiI6W119",
        "https://mint.example.com",
    )
}

#[tokio::test]
async fn reachable_mesh_peer_never_touches_the_relay() {
    let fx = fixture();
    let peer = recipient_peer();
    fx.mesh.add_reachable(peer.clone());
    // relay would be viable too; the tie-break must still pick mesh
    fx.directory.set_mutual(peer.clone(), recipient_keys().identity());

    let outcome = fx.router.send(&record(&fx), &peer).await;

    assert_eq!(outcome, SendOutcome::Sent(TransportKind::Mesh));
    assert_eq!(fx.mesh.sent_count(), 1);
    assert_eq!(fx.relay.published_count(), 0);
    assert_eq!(fx.router.queued_count(&peer), 0);

    // the mesh carried a decodable wire payload with the token intact
    let (sent_to, payload) = fx.mesh.sent().remove(0);
    assert_eq!(sent_to, peer);
    let decoded = satchel_wire::decode(&payload).expect("decode");
    assert_eq!(decoded.token_payload, "cashuAeyJ0b2tlbiI6W119");
}

#[tokio::test]
async fn unreachable_mutual_favorite_goes_over_the_relay() {
    let fx = fixture();
    let peer = recipient_peer();
    let recipient = recipient_keys();
    fx.directory.set_mutual(peer.clone(), recipient.identity());

    let mut rec = record(&fx);
    rec.id = "abc".to_string();
    rec.sender_identity = IdentityKey::from("npub1xyz");
    let outcome = fx.router.send(&rec, &peer).await;

    assert_eq!(outcome, SendOutcome::Sent(TransportKind::Relay));
    assert_eq!(fx.mesh.sent_count(), 0);
    assert_eq!(fx.router.queued_count(&peer), 0);

    let published = fx.relay.published();
    assert_eq!(published.len(), 1);
    let wrap = &published[0];
    assert_eq!(wrap.kind, KIND_GIFT_WRAP);
    assert_eq!(wrap.recipient_tag(), Some(recipient.identity()));
    // the wrap's author is an ephemeral key, not our identity
    assert_ne!(wrap.author(), fx.keys.identity());
}

#[tokio::test]
async fn no_transport_queues_and_touches_neither_log() {
    let fx = fixture();
    let peer = recipient_peer();

    let outcome = fx.router.send(&record(&fx), &peer).await;

    assert_eq!(outcome, SendOutcome::Queued);
    assert_eq!(fx.mesh.sent_count(), 0);
    assert_eq!(fx.relay.published_count(), 0);
    assert_eq!(fx.router.queued_count(&peer), 1);
    assert_eq!(fx.router.all_queued().len(), 1);
}

#[tokio::test]
async fn one_sided_favorite_is_not_relay_eligible() {
    let fx = fixture();
    let peer = recipient_peer();
    fx.directory.set(
        peer.clone(),
        satchel_core::Relationship {
            is_favorite: true,
            they_favorited_us: false,
            relay_identity: Some(recipient_keys().identity()),
        },
    );

    assert_eq!(fx.router.send(&record(&fx), &peer).await, SendOutcome::Queued);
    assert_eq!(fx.relay.published_count(), 0);
}

#[tokio::test]
async fn mesh_failure_falls_through_to_relay() {
    let fx = fixture();
    let peer = recipient_peer();
    fx.mesh.add_reachable(peer.clone());
    fx.mesh.fail_sends_to(peer.clone());
    fx.directory.set_mutual(peer.clone(), recipient_keys().identity());

    let outcome = fx.router.send(&record(&fx), &peer).await;
    assert_eq!(outcome, SendOutcome::Sent(TransportKind::Relay));
    assert_eq!(fx.relay.published_count(), 1);
}

#[tokio::test]
async fn relay_failure_falls_through_to_queue() {
    let fx = fixture();
    let peer = recipient_peer();
    fx.directory.set_mutual(peer.clone(), recipient_keys().identity());
    fx.relay.fail_publishes(true);

    let outcome = fx.router.send(&record(&fx), &peer).await;
    assert_eq!(outcome, SendOutcome::Queued);
    assert_eq!(fx.router.queued_count(&peer), 1);
}

#[tokio::test]
async fn flush_delivers_queued_sends_when_peer_appears() {
    let fx = fixture();
    let peer = recipient_peer();
    fx.router.send(&record(&fx), &peer).await;
    assert_eq!(fx.router.queued_count(&peer), 1);

    fx.mesh.add_reachable(peer.clone());
    let delivered = fx.router.flush(&peer).await;

    assert_eq!(delivered, 1);
    assert_eq!(fx.router.queued_count(&peer), 0);
    assert_eq!(fx.mesh.sent_count(), 1);
}

#[tokio::test]
async fn partial_flush_keeps_undelivered_entries() {
    let fx = fixture();
    let peer = recipient_peer();
    fx.router.send(&record(&fx), &peer).await;
    fx.router.send(&record(&fx), &peer).await;
    assert_eq!(fx.router.queued_count(&peer), 2);

    // reachable but every send fails: flush must not lose the entries
    fx.mesh.add_reachable(peer.clone());
    fx.mesh.fail_sends_to(peer.clone());
    let delivered = fx.router.flush(&peer).await;

    assert_eq!(delivered, 0);
    assert_eq!(fx.router.queued_count(&peer), 2);
}

#[tokio::test]
async fn flush_does_not_requeue_its_own_failures() {
    let fx = fixture();
    let peer = recipient_peer();
    fx.router.send(&record(&fx), &peer).await;

    // no transport viable during the flush either
    let delivered = fx.router.flush(&peer).await;
    assert_eq!(delivered, 0);
    // still exactly one entry, not one per failed retry
    assert_eq!(fx.router.queued_count(&peer), 1);
}

#[tokio::test]
async fn expired_entries_fail_and_never_deliver() {
    let fx = fixture_with_config(RouterConfig {
        outbox_retention_secs: 0,
    });
    let peer = recipient_peer();
    fx.router.send(&record(&fx), &peer).await;
    assert_eq!(fx.router.queued_count(&peer), 1);

    let expired = fx.router.cleanup_expired();
    assert_eq!(expired.len(), 1);
    assert_matches!(
        &expired[0].1,
        SendOutcome::Failed { reason } if reason == "expired"
    );
    assert_eq!(fx.router.queued_count(&peer), 0);

    // a later flush for that peer must not resurrect the send
    fx.mesh.add_reachable(peer.clone());
    assert_eq!(fx.router.flush(&peer).await, 0);
    assert_eq!(fx.mesh.sent_count(), 0);
}

#[tokio::test]
async fn cleanup_keeps_fresh_entries() {
    let fx = fixture();
    let peer = recipient_peer();
    fx.router.send(&record(&fx), &peer).await;
    assert!(fx.router.cleanup_expired().is_empty());
    assert_eq!(fx.router.queued_count(&peer), 1);
}

#[tokio::test]
async fn broadcast_goes_straight_to_the_mesh() {
    let fx = fixture();
    let outcome = fx.router.broadcast(&record(&fx)).await;
    assert_eq!(outcome, SendOutcome::Sent(TransportKind::Mesh));
    assert_eq!(fx.mesh.broadcasts().len(), 1);
}

#[tokio::test]
async fn inbound_mesh_payload_is_decoded_and_redeemed() {
    let fx = fixture();
    let rec = record(&fx);
    let payload = satchel_wire::encode(&rec).expect("encode");

    let handled = fx
        .router
        .handle_mesh_payload(&recipient_peer(), &payload)
        .await
        .expect("handle");
    let handled = handled.expect("record");
    assert!(handled.claimed);
    assert_eq!(fx.redeemer.redeemed(), vec![rec.token_payload.clone()]);

    // same token again: idempotent redemption, record not re-claimed
    let again = fx
        .router
        .handle_mesh_payload(&recipient_peer(), &payload)
        .await
        .expect("handle")
        .expect("record");
    assert!(!again.claimed);
    assert_eq!(fx.redeemer.redeemed().len(), 1);
}

#[tokio::test]
async fn inbound_garbage_is_dropped_silently() {
    let fx = fixture();
    let handled = fx
        .router
        .handle_mesh_payload(&recipient_peer(), &[0xFF; 16])
        .await
        .expect("handle");
    assert!(handled.is_none());
    assert!(fx.redeemer.redeemed().is_empty());
}

#[tokio::test]
async fn redemption_failure_is_surfaced() {
    let fx = fixture();
    fx.redeemer.fail_with("mint unreachable");
    let payload = satchel_wire::encode(&record(&fx)).expect("encode");
    let result = fx
        .router
        .handle_mesh_payload(&recipient_peer(), &payload)
        .await;
    assert!(result.is_err());
}
