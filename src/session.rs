use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// The session data of one request/response cycle: a string-keyed map of
/// arbitrary serializable values, plus the state the lifecycle manager needs
/// to decide whether and under which identity to persist it.
///
/// Change tracking is automatic. Every mutating method flips the modified
/// flag, and only modified sessions are written to the store or set a cookie,
/// so requests that merely read their session cost nothing. It is marked
/// `#[must_use]`, as dropping it will not update the backing store; pass it
/// to [`SessionManager::save`](crate::SessionManager::save) instead.
///
/// # Example
///
/// ```rust
/// # use kv_session::Session;
/// # fn main() -> kv_session::Result {
/// let mut session = Session::new();
/// assert!(session.is_new());
/// assert!(!session.is_modified());
///
/// session.insert("user", "alice")?;
/// assert!(session.is_modified());
/// assert_eq!(session.get_as::<String>("user").as_deref(), Some("alice"));
/// # Ok(()) }
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct Session {
    pub(crate) payload: HashMap<String, Value>,
    pub(crate) sid: Option<String>,
    pub(crate) new: bool,
    pub(crate) modified: bool,
    pub(crate) permanent: bool,
}

impl Session {
    /// Create an empty session with no persisted identity.
    ///
    /// This is what [`SessionManager::open`](crate::SessionManager::open)
    /// returns for requests without a usable cookie. Until a mutation
    /// happens, the session is invisible to store and client alike.
    pub fn new() -> Self {
        Self {
            payload: HashMap::new(),
            sid: None,
            new: true,
            modified: false,
            permanent: false,
        }
    }

    /// **This method should only be called by the session manager.**
    ///
    /// Reconstruct a session from its persisted payload, bound to the
    /// identifier it was stored under.
    pub(crate) fn from_store(sid: String, payload: HashMap<String, Value>) -> Self {
        Self {
            payload,
            sid: Some(sid),
            new: false,
            modified: false,
            permanent: false,
        }
    }

    /// The encoded session id this session was loaded from or last saved
    /// under, if any.
    pub fn id(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// True if this session has no persisted identity yet.
    pub fn is_new(&self) -> bool {
        self.new
    }

    /// True if payload or permanence changed since the session was opened.
    /// Only modified sessions are persisted on save.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// True if the session cookie should outlive the browser session.
    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    /// Mark the session as permanent or not. Permanent sessions receive a
    /// cookie with an explicit expiry of now plus the configured lifetime;
    /// others get a plain browser-session cookie. Counts as a modification.
    pub fn set_permanent(&mut self, permanent: bool) {
        self.permanent = permanent;
        self.modified = true;
    }

    /// Returns the value stored under `key`, if any. Does not mark the
    /// session as modified.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Returns the value stored under `key` deserialized as `T`. Values of a
    /// different shape come back as `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.payload
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Store `value` under `key`, marking the session as modified.
    ///
    /// Fails with [`Error::Payload`](crate::Error::Payload) if the value
    /// cannot be serialized; in that case nothing is stored and the modified
    /// flag is left alone.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) -> Result {
        let value = serde_json::to_value(value).map_err(crate::Error::Payload)?;
        self.payload.insert(key.into(), value);
        self.modified = true;
        Ok(())
    }

    /// Remove the value stored under `key`, marking the session as modified
    /// if there was one.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.payload.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// Delete all keys, marking the session as modified.
    pub fn clear(&mut self) {
        self.payload.clear();
        self.modified = true;
    }

    /// True if a value is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.payload.contains_key(key)
    }

    /// The keys currently present, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.payload.keys().map(String::as_str)
    }

    /// Number of keys in the session.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True if the session holds no data.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// The full payload mapping.
    pub fn payload(&self) -> &HashMap<String, Value> {
        &self.payload
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
