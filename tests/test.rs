use chrono::{Duration, Utc};
use kv_session::{
    CookieSigner, Error, MemoryStore, Operation, SessionConfig, SessionCookieCommand, SessionId,
    SessionManager, SessionStore, StoreError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

const SECRET: &[u8] = b"devkey";

fn config() -> SessionConfig {
    SessionConfig::new().with_secret_key(SECRET.to_vec())
}

/// A manager with a deterministic random source, so session ids are
/// reproducible across test runs.
fn manager_with(store: MemoryStore, config: SessionConfig) -> SessionManager<MemoryStore, StdRng> {
    SessionManager::new_with_rng(store, config, StdRng::seed_from_u64(0))
}

fn manager() -> SessionManager<MemoryStore, StdRng> {
    manager_with(MemoryStore::new(), config())
}

fn set_cookie(command: SessionCookieCommand) -> String {
    match command {
        SessionCookieCommand::Set { cookie_value, .. } => cookie_value,
        SessionCookieCommand::DoNothing => panic!("expected the session cookie to be set"),
    }
}

/// Minted ids survive an encode/decode round trip and serialize as two
/// lowercase hex fields joined by an underscore.
#[test]
fn test_session_id_round_trip() {
    let mut rng = StdRng::seed_from_u64(1);
    let now = Utc::now();

    for bits in [1, 8, 64, 128] {
        for _ in 0..25 {
            let id = SessionId::mint(&mut rng, bits, now);
            let encoded = id.encode();

            let (id_hex, created_hex) = encoded.split_once('_').unwrap();
            for field in [id_hex, created_hex] {
                assert!(!field.is_empty());
                assert!(field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
            }

            assert_eq!(SessionId::decode(&encoded).unwrap(), id);
        }
    }
}

/// Strings that are not exactly two non-empty lowercase hex fields joined by
/// a single underscore fail to decode.
#[test]
fn test_session_id_decode_rejects_malformed() {
    for input in [
        "",
        "abc",
        "abc_",
        "_abc",
        "_",
        "a_b_c",
        "xyz_12",
        "12_xyz",
        "AB_12",
        "12_AB",
        "+12_34",
        "12_+34",
        " 12_34",
    ] {
        assert!(
            matches!(
                SessionId::decode(input),
                Err(Error::MalformedSessionId(ref s)) if s == input
            ),
            "expected {input:?} to be rejected"
        );
    }
}

/// A signed value comes back out unchanged, but only under the key that
/// signed it.
#[test]
fn test_signer_round_trip_rejects_wrong_key() {
    let signer = CookieSigner::new(SECRET.to_vec());
    let token = signer.sign("deadbeef_4e184a07");

    assert_eq!(signer.unsign(&token).unwrap(), "deadbeef_4e184a07");
    assert!(matches!(
        CookieSigner::new(b"otherkey".to_vec()).unsign(&token),
        Err(Error::Tampered)
    ));
}

/// Flipping any single character of a signed token, in the value or in the
/// signature, is detected.
#[test]
fn test_signer_detects_any_single_character_flip() {
    let signer = CookieSigner::new(SECRET.to_vec());
    let token = signer.sign("deadbeef_4e184a07");

    for i in 0..token.len() {
        let original = token.as_bytes()[i];
        let replacement = if original == b'a' { b'b' } else { b'a' };
        let mut broken = token.clone().into_bytes();
        broken[i] = replacement;
        let broken = String::from_utf8(broken).unwrap();

        assert!(
            signer.unsign(&broken).is_err(),
            "flip at position {i} went undetected"
        );
    }
}

/// A request that never touches session data causes no store writes and no
/// cookie.
#[async_std::test]
async fn test_read_only_request_writes_nothing() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    assert!(session.is_new());
    let _ = session.get("missing");

    assert_eq!(
        manager.save(&mut session).await.unwrap(),
        SessionCookieCommand::DoNothing
    );
    assert!(manager.store().is_empty());
    assert_eq!(manager.store().operations(), &[]);
}

/// The memory store honors the get/put/delete/keys contract, including
/// idempotent deletes.
#[async_std::test]
async fn test_memory_store_contract() {
    let mut store = MemoryStore::new();

    store.put("k", b"v1", None).await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), b"v1");

    store.put("k", b"v2", None).await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), b"v2");
    assert_eq!(store.keys().await.unwrap(), vec!["k".to_string()]);

    store.delete("k").await.unwrap();
    assert!(matches!(
        store.get("k").await,
        Err(StoreError::NotFound(ref key)) if key == "k"
    ));
    // deleting again is a no-op, not an error
    store.delete("k").await.unwrap();
}

/// Data stored in one request/response cycle is visible in the next, across
/// multiple cycles.
#[async_std::test]
async fn test_session_restores_properly() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("k1", "value1").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let mut session = manager.open(Some(&cookie)).await.unwrap();
    assert!(!session.is_new());
    session.insert("k2", "value2").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let session = manager.open(Some(&cookie)).await.unwrap();
    assert_eq!(session.get("k1"), Some(&json!("value1")));
    assert_eq!(session.get("k2"), Some(&json!("value2")));
}

/// Overwriting a key persists the newest value.
#[async_std::test]
async fn test_can_change_values() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("k1", "value1").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let mut session = manager.open(Some(&cookie)).await.unwrap();
    assert_eq!(session.get("k1"), Some(&json!("value1")));
    session.insert("k1", "value2").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let session = manager.open(Some(&cookie)).await.unwrap();
    assert_eq!(session.get("k1"), Some(&json!("value2")));
}

/// Removing one of two keys leaves only the other.
#[async_std::test]
async fn test_can_delete_values() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("k1", "value1").unwrap();
    session.insert("k2", "value2").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let mut session = manager.open(Some(&cookie)).await.unwrap();
    assert_eq!(session.remove("k1"), Some(json!("value1")));
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let session = manager.open(Some(&cookie)).await.unwrap();
    assert!(!session.contains_key("k1"));
    assert_eq!(session.get("k2"), Some(&json!("value2")));
}

/// Destroying a session empties it, removes the store entry, and leaves the
/// stale client cookie to fall back to a fresh session on the next open.
#[async_std::test]
async fn test_can_destroy_sessions() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("k1", "value1").unwrap();
    session.insert("k2", "value2").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let mut session = manager.open(Some(&cookie)).await.unwrap();
    manager.destroy(&mut session).await.unwrap();
    assert!(session.is_empty());
    assert_eq!(session.id(), None);
    assert!(manager.store().is_empty());

    // destroy does not count as a modification to be persisted
    assert_eq!(
        manager.save(&mut session).await.unwrap(),
        SessionCookieCommand::DoNothing
    );

    // the old cookie now resolves to a fresh anonymous session
    let session = manager.open(Some(&cookie)).await.unwrap();
    assert!(session.is_new());
    assert!(session.is_empty());
}

/// A permanent session with a one second lifetime is gone two seconds later,
/// replaced by a fresh session.
#[async_std::test]
async fn test_session_expires() {
    let mut manager = manager_with(
        MemoryStore::new(),
        config().with_lifetime(Duration::seconds(1)),
    );

    let mut session = manager.open(None).await.unwrap();
    session.insert("k1", "value1").unwrap();
    session.set_permanent(true);
    let command = manager.save(&mut session).await.unwrap();
    assert!(matches!(
        command,
        SessionCookieCommand::Set { expires: Some(_), .. }
    ));
    let cookie = set_cookie(command);

    let session = manager.open(Some(&cookie)).await.unwrap();
    assert_eq!(session.get("k1"), Some(&json!("value1")));

    async_std::task::sleep(std::time::Duration::from_secs(2)).await;

    let session = manager.open(Some(&cookie)).await.unwrap();
    assert!(session.is_new());
    assert!(session.is_empty());
}

/// Non-permanent sessions get a browser-session cookie without an expiry.
#[async_std::test]
async fn test_non_permanent_cookie_has_no_expiry() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("k", "v").unwrap();
    assert!(matches!(
        manager.save(&mut session).await.unwrap(),
        SessionCookieCommand::Set { expires: None, .. }
    ));
}

/// The sweeper leaves live sessions alone and removes them once their
/// lifetime has passed, permanence notwithstanding.
#[async_std::test]
async fn test_cleanup_removes_expired_sessions() {
    let mut manager = manager_with(
        MemoryStore::new(),
        config().with_lifetime(Duration::seconds(1)),
    );

    let mut session = manager.open(None).await.unwrap();
    session.insert("k1", "value1").unwrap();
    session.set_permanent(true);
    manager.save(&mut session).await.unwrap();

    assert_eq!(manager.cleanup().await.unwrap(), 0);
    assert_eq!(manager.store().len(), 1);

    async_std::task::sleep(std::time::Duration::from_secs(2)).await;

    assert_eq!(manager.cleanup().await.unwrap(), 1);
    assert!(manager.store().is_empty());
}

/// Store keys that do not look like session ids are not the sweeper's to
/// delete.
#[async_std::test]
async fn test_cleanup_skips_foreign_keys() {
    let mut manager = manager_with(
        MemoryStore::new(),
        config().with_lifetime(Duration::seconds(1)),
    );

    manager
        .store_mut()
        .put("not-a-session", b"payload", None)
        .await
        .unwrap();
    manager
        .store_mut()
        .put("AB_12", b"uppercase", None)
        .await
        .unwrap();

    // a genuinely expired session key is removed alongside
    let expired = SessionId::new(0x1234, Utc::now() - Duration::days(1)).encode();
    manager.store_mut().put(&expired, b"{}", None).await.unwrap();

    assert_eq!(manager.cleanup().await.unwrap(), 1);
    assert!(manager.store().contains_key("not-a-session"));
    assert!(manager.store().contains_key("AB_12"));
    assert!(!manager.store().contains_key(&expired));
}

/// Regeneration retires the old identifier immediately; the store never holds
/// two entries for the same logical session.
#[async_std::test]
async fn test_regenerate_swaps_identifier() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("user", "alice").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let mut session = manager.open(Some(&cookie)).await.unwrap();
    let old_sid = session.id().unwrap().to_string();

    manager.regenerate(&mut session).await.unwrap();
    // the old entry is gone before the new one is ever written
    assert!(manager.store().is_empty());
    assert!(session.is_modified());

    let new_cookie = set_cookie(manager.save(&mut session).await.unwrap());
    let new_sid = session.id().unwrap().to_string();

    assert_ne!(old_sid, new_sid);
    assert_ne!(cookie, new_cookie);
    assert_eq!(manager.store().len(), 1);
    assert!(manager.store().contains_key(&new_sid));

    // the payload survived the identity swap
    let session = manager.open(Some(&new_cookie)).await.unwrap();
    assert_eq!(session.get("user"), Some(&json!("alice")));
}

/// Regeneration persists on the next save even if the payload was never
/// touched in this cycle.
#[async_std::test]
async fn test_regenerate_persists_unchanged_payload() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("user", "alice").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let mut session = manager.open(Some(&cookie)).await.unwrap();
    assert!(!session.is_modified());
    manager.regenerate(&mut session).await.unwrap();

    assert!(matches!(
        manager.save(&mut session).await.unwrap(),
        SessionCookieCommand::Set { .. }
    ));
}

/// Saving twice without an intervening mutation writes to the store only
/// once; the second save observes an unmodified session.
#[async_std::test]
async fn test_save_is_idempotent() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("k", "v").unwrap();

    assert!(matches!(
        manager.save(&mut session).await.unwrap(),
        SessionCookieCommand::Set { .. }
    ));
    assert_eq!(
        manager.save(&mut session).await.unwrap(),
        SessionCookieCommand::DoNothing
    );

    let puts = manager
        .store()
        .operations()
        .iter()
        .filter(|op| matches!(op, Operation::Put { .. }))
        .count();
    assert_eq!(puts, 1);
}

/// A TTL-capable store receives the configured lifetime with every write; a
/// plain store receives no TTL at all.
#[async_std::test]
async fn test_ttl_passed_only_when_supported() {
    let mut ttl_manager = manager_with(
        MemoryStore::with_ttl_support(),
        config().with_lifetime(Duration::hours(2)),
    );
    let mut session = ttl_manager.open(None).await.unwrap();
    session.insert("k", "v").unwrap();
    ttl_manager.save(&mut session).await.unwrap();
    assert!(matches!(
        ttl_manager.store().operations(),
        [Operation::Put {
            ttl_seconds: Some(7200),
            ..
        }]
    ));

    let mut manager = manager();
    let mut session = manager.open(None).await.unwrap();
    session.insert("k", "v").unwrap();
    manager.save(&mut session).await.unwrap();
    assert!(matches!(
        manager.store().operations(),
        [Operation::Put {
            ttl_seconds: None,
            ..
        }]
    ));
}

/// Without a secret key the application still runs: opening ignores cookies
/// and yields fresh sessions, and only actually mutating session state is a
/// configuration error.
#[async_std::test]
async fn test_missing_secret_key() {
    let mut manager = manager_with(MemoryStore::new(), SessionConfig::new());

    let session = manager.open(Some("whatever.signature")).await.unwrap();
    assert!(session.is_new());

    let mut session = manager.open(None).await.unwrap();
    assert_eq!(
        manager.save(&mut session).await.unwrap(),
        SessionCookieCommand::DoNothing
    );

    session.insert("k", "v").unwrap();
    assert!(matches!(
        manager.save(&mut session).await,
        Err(Error::MissingSecretKey)
    ));
}

/// An expired but correctly signed cookie is treated like an absent one,
/// even if the store entry still exists.
#[async_std::test]
async fn test_expired_cookie_treated_as_absent() {
    let mut manager = manager();

    let stale_sid = SessionId::new(0xdeadbeef, Utc::now() - Duration::days(40)).encode();
    manager
        .store_mut()
        .put(&stale_sid, br#"{"user":"alice"}"#, None)
        .await
        .unwrap();
    let cookie = CookieSigner::new(SECRET.to_vec()).sign(&stale_sid);

    let session = manager.open(Some(&cookie)).await.unwrap();
    assert!(session.is_new());
    assert!(session.is_empty());
}

/// The cookie value is the signed encoded session id, and the id is the key
/// the payload was stored under.
#[async_std::test]
async fn test_cookie_is_signed_store_key() {
    let mut manager = manager();

    let mut session = manager.open(None).await.unwrap();
    session.insert("k", "v").unwrap();
    let cookie = set_cookie(manager.save(&mut session).await.unwrap());

    let sid = CookieSigner::new(SECRET.to_vec()).unsign(&cookie).unwrap();
    assert_eq!(session.id(), Some(sid.as_str()));
    SessionId::decode(&sid).unwrap();
    assert!(manager.store().contains_key(&sid));
}
