use crate::error::StoreError;
use async_trait::async_trait;

/// The backend-facing contract of the session system: a key-value store with
/// byte values, keyed by encoded session ids.
///
/// Backends are treated as black boxes with atomic per-key operations. The
/// only failure the lifecycle manager handles specially is
/// [`StoreError::NotFound`]; everything else is considered fatal for the
/// operation in progress and is never retried here.
#[async_trait]
pub trait SessionStore {
    /// Whether the backend expires entries on its own.
    ///
    /// Checked once per save: capable backends receive the session lifetime
    /// as a TTL with every write, and expired entries disappear without help.
    /// For everything else [`SessionManager::cleanup`](crate::SessionManager::cleanup)
    /// is the only removal path besides explicit deletes.
    fn ttl_support(&self) -> bool {
        false
    }

    /// Fetch the value stored under `key`, or [`StoreError::NotFound`].
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// `ttl_seconds` is only passed when [`ttl_support`](Self::ttl_support)
    /// reports true; implementations without native expiry never see it.
    async fn put(&mut self, key: &str, value: &[u8], ttl_seconds: Option<u64>)
        -> Result<(), StoreError>;

    /// Delete the value stored under `key`. Idempotent: deleting an absent
    /// key is not an error.
    async fn delete(&mut self, key: &str) -> Result<(), StoreError>;

    /// All keys currently stored, in no particular order. The store may hold
    /// data other than sessions; the sweeper filters for session-shaped keys.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}
