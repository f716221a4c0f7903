//! End-to-end direct-message scenarios.
//!
//! Two clients share one registry and one ledger and exercise the whole
//! subsystem: first contact, rotation with historical decryption, the
//! documented peer-rotation limitation, and per-message failure
//! isolation.

use sealnote_client::{
    DmIdentity, MemoryKeyStore, MessageBody, SessionKeyError, SessionKeyManager,
    read_conversation, seal_direct_message, send_direct_message,
};
use sealnote_core::{ADDRESS_SIZE, Address, ConversationId, MessageLedger};
use sealnote_harness::{InMemoryLedger, InMemoryRegistry, SimEnvironment};

const ALICE: Address = Address([0xA1; ADDRESS_SIZE]);
const BOB: Address = Address([0xB2; ADDRESS_SIZE]);
const CONVERSATION: ConversationId = ConversationId(0x1234_5678_9abc_def0);

type SimManager = SessionKeyManager<SimEnvironment, InMemoryRegistry, MemoryKeyStore>;

fn client(owner: Address, seed: u64, registry: &InMemoryRegistry) -> SimManager {
    SessionKeyManager::new(
        SimEnvironment::with_seed(seed),
        registry.clone(),
        MemoryKeyStore::new(),
        DmIdentity::new(owner),
    )
    .unwrap()
}

#[tokio::test]
async fn first_contact_roundtrip() {
    let registry = InMemoryRegistry::new();
    let ledger = InMemoryLedger::new();

    let alice = client(ALICE, 1, &registry);
    let bob = client(BOB, 2, &registry);

    // A publishes; B fetches exactly A's current public bytes
    alice.ensure_key().await.unwrap();
    let fetched = bob.peer_public_key(ALICE).await.unwrap().unwrap();
    assert_eq!(&fetched, alice.active_key().await.unwrap().public().as_bytes());

    bob.ensure_key().await.unwrap();
    send_direct_message(&bob, &ledger, CONVERSATION, ALICE, "hello").await.unwrap();

    let entries = read_conversation(&alice, &ledger, CONVERSATION, BOB).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].sender_owner, BOB);
    assert_eq!(entries[0].body, MessageBody::Text("hello".to_string()));
}

#[tokio::test]
async fn rotation_keeps_old_messages_readable() {
    let registry = InMemoryRegistry::new();
    let ledger = InMemoryLedger::new();

    let alice = client(ALICE, 3, &registry);
    let bob = client(BOB, 4, &registry);

    alice.ensure_key().await.unwrap();
    bob.ensure_key().await.unwrap();

    // B sends while A's first key is current
    send_direct_message(&bob, &ledger, CONVERSATION, ALICE, "before rotation").await.unwrap();

    // B caches A's key, as a real sender would between registry reads
    let cached_alice_key = bob.peer_public_key(ALICE).await.unwrap().unwrap();

    alice.rotate().await.unwrap();
    alice.confirm_pending().await.unwrap();

    // B still encrypts against the cached, now-stale key
    let bob_active = bob.active_key().await.unwrap();
    let stale_blob =
        seal_direct_message(bob.env(), &bob_active, &cached_alice_key, "after rotation").unwrap();
    ledger.append(CONVERSATION, BOB, BOB, stale_blob).await.unwrap();

    // Both decrypt: the second one only via A's historical list
    let entries = read_conversation(&alice, &ledger, CONVERSATION, BOB).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].body, MessageBody::Text("before rotation".to_string()));
    assert_eq!(entries[1].body, MessageBody::Text("after rotation".to_string()));
}

#[tokio::test]
async fn messages_stay_readable_across_many_rotations() {
    let registry = InMemoryRegistry::new();
    let ledger = InMemoryLedger::new();

    let alice = client(ALICE, 5, &registry);
    let bob = client(BOB, 6, &registry);

    alice.ensure_key().await.unwrap();
    bob.ensure_key().await.unwrap();

    for round in 0..4 {
        let text = format!("round {round}");
        send_direct_message(&bob, &ledger, CONVERSATION, ALICE, &text).await.unwrap();

        alice.rotate().await.unwrap();
        alice.confirm_pending().await.unwrap();
    }

    let entries = read_conversation(&alice, &ledger, CONVERSATION, BOB).await.unwrap();
    assert_eq!(entries.len(), 4);
    for (round, entry) in entries.iter().enumerate() {
        assert_eq!(entry.body, MessageBody::Text(format!("round {round}")));
    }
}

#[tokio::test]
async fn own_sends_decrypt_until_the_peer_rotates() {
    let registry = InMemoryRegistry::new();
    let ledger = InMemoryLedger::new();

    let alice = client(ALICE, 7, &registry);
    let bob = client(BOB, 8, &registry);

    alice.ensure_key().await.unwrap();
    bob.ensure_key().await.unwrap();

    send_direct_message(&alice, &ledger, CONVERSATION, BOB, "my own message").await.unwrap();

    // Readable while B's key is unchanged
    let entries = read_conversation(&alice, &ledger, CONVERSATION, BOB).await.unwrap();
    assert_eq!(entries[0].body, MessageBody::Text("my own message".to_string()));
    assert_eq!(entries[0].sender_owner, ALICE);

    // Documented limitation: we keep no record of which peer key a send
    // used, so our own old messages go unreadable once the peer rotates
    bob.rotate().await.unwrap();
    bob.confirm_pending().await.unwrap();

    let entries = read_conversation(&alice, &ledger, CONVERSATION, BOB).await.unwrap();
    assert!(entries[0].body.is_unreadable());
}

#[tokio::test]
async fn missing_peer_key_blocks_sending_not_reading() {
    let registry = InMemoryRegistry::new();
    let ledger = InMemoryLedger::new();

    let alice = client(ALICE, 9, &registry);
    alice.ensure_key().await.unwrap();

    // B never published: sending is a precondition failure
    let result = send_direct_message(&alice, &ledger, CONVERSATION, BOB, "anyone there?").await;
    assert!(matches!(result, Err(SessionKeyError::MissingPeerKey { peer }) if peer == BOB));
    assert_eq!(ledger.message_count(CONVERSATION), 0);

    // Reading still works; foreign blobs just render as placeholders
    ledger.append(CONVERSATION, BOB, BOB, vec![0x00; 40]).await.unwrap();
    let entries = read_conversation(&alice, &ledger, CONVERSATION, BOB).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].body.is_unreadable());
}

#[tokio::test]
async fn one_bad_message_never_blocks_the_batch() {
    let registry = InMemoryRegistry::new();
    let ledger = InMemoryLedger::new();

    let alice = client(ALICE, 10, &registry);
    let bob = client(BOB, 11, &registry);

    alice.ensure_key().await.unwrap();
    bob.ensure_key().await.unwrap();

    send_direct_message(&bob, &ledger, CONVERSATION, ALICE, "first").await.unwrap();

    // A tampered envelope and a truncated one land mid-conversation
    let alice_key = bob.peer_public_key(ALICE).await.unwrap().unwrap();
    let bob_active = bob.active_key().await.unwrap();
    let mut tampered =
        seal_direct_message(bob.env(), &bob_active, &alice_key, "tampered").unwrap();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    ledger.append(CONVERSATION, BOB, BOB, tampered).await.unwrap();
    ledger.append(CONVERSATION, BOB, BOB, vec![0x01; 4]).await.unwrap();

    send_direct_message(&bob, &ledger, CONVERSATION, ALICE, "last").await.unwrap();

    let entries = read_conversation(&alice, &ledger, CONVERSATION, BOB).await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].body, MessageBody::Text("first".to_string()));
    assert!(entries[1].body.is_unreadable());
    assert!(entries[2].body.is_unreadable());
    assert_eq!(entries[3].body, MessageBody::Text("last".to_string()));

    // Order and timestamps are preserved around the failures
    assert!(entries.windows(2).all(|w| w[0].timestamp_secs < w[1].timestamp_secs));
}

#[tokio::test]
async fn delegate_signed_messages_belong_to_their_owner() {
    let registry = InMemoryRegistry::new();
    let ledger = InMemoryLedger::new();

    let delegate = Address([0xD3; ADDRESS_SIZE]);
    let bob_delegated = SessionKeyManager::new(
        SimEnvironment::with_seed(12),
        registry.clone(),
        MemoryKeyStore::new(),
        DmIdentity::with_signer(BOB, delegate),
    )
    .unwrap();
    let alice = client(ALICE, 13, &registry);

    alice.ensure_key().await.unwrap();
    bob_delegated.ensure_key().await.unwrap();

    send_direct_message(&bob_delegated, &ledger, CONVERSATION, ALICE, "via delegate")
        .await
        .unwrap();

    let entries = read_conversation(&alice, &ledger, CONVERSATION, BOB).await.unwrap();
    assert_eq!(entries[0].sender_owner, BOB);
    assert_eq!(entries[0].sender_address, delegate);
    assert_eq!(entries[0].body, MessageBody::Text("via delegate".to_string()));
}
