use crate::error::StoreError;
use crate::store::SessionStore;
use async_trait::async_trait;
use std::collections::HashMap;

/// # in-memory session store
///
/// Because there is no external persistence, this store is ephemeral and will
/// be cleared on server restart.
///
/// # ***READ THIS BEFORE USING IN A PRODUCTION DEPLOYMENT***
///
/// Storing sessions only in memory brings the following problems:
///
/// 1. All sessions must fit in available memory (important for high load services)
/// 2. Sessions are only removed by explicit deletes or by running
///    [`SessionManager::cleanup`](crate::SessionManager::cleanup).
///    If sessions are not cleaned up properly it might result in OOM
/// 3. All sessions will be lost on shutdown
/// 4. If the service is clustered a particular session will be stored only on
///    a single instance
///
/// Every mutation is additionally recorded in an operation journal, so tests
/// can assert exactly which writes a request caused, in particular that a
/// read-only request caused none.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
    journal: Vec<Operation>,
    ttl_support: bool,
}

/// A mutation recorded by [`MemoryStore`]. Reads are not journaled.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Operation {
    /// A value was written.
    Put {
        /// The key written to.
        key: String,
        /// The TTL requested by the caller, if any. Recorded but not
        /// enforced; this store has no timer.
        ttl_seconds: Option<u64>,
    },
    /// A key was deleted (whether or not it existed).
    Delete {
        /// The key deleted.
        key: String,
    },
}

impl MemoryStore {
    /// Create a new empty memory store without TTL support.
    pub fn new() -> Self {
        Default::default()
    }

    /// Create a store that reports TTL capability.
    ///
    /// The requested TTL shows up in the journal but entries are not actually
    /// expired, which makes this the test double for the capability-detection
    /// path of [`SessionManager::save`](crate::SessionManager::save). A real
    /// TTL-capable backend would expire entries itself.
    pub fn with_ttl_support() -> Self {
        Self {
            ttl_support: true,
            ..Default::default()
        }
    }

    /// Returns the number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The mutations performed on this store, oldest first.
    pub fn operations(&self) -> &[Operation] {
        &self.journal
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn ttl_support(&self) -> bool {
        self.ttl_support
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(
        &mut self,
        key: &str,
        value: &[u8],
        ttl_seconds: Option<u64>,
    ) -> Result<(), StoreError> {
        self.journal.push(Operation::Put {
            key: key.to_string(),
            ttl_seconds,
        });
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.journal.push(Operation::Delete {
            key: key.to_string(),
        });
        self.entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}
