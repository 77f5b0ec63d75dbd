/// All errors that can occur in this crate.
///
/// The tamper and malformed-id variants exist so the signer and the id codec
/// can be used (and tested) on their own. [`SessionManager::open`](crate::SessionManager::open)
/// never surfaces them: a cookie that fails verification or decoding is
/// treated like an absent cookie and answered with a fresh session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A signed cookie value failed signature verification.
    /// Either the value or the signature was altered in transit.
    #[error("session cookie failed signature verification")]
    Tampered,

    /// A session id string did not have the expected `<id-hex>_<created-hex>`
    /// shape of two non-empty lowercase hex fields.
    #[error("malformed session id {0:?}")]
    MalformedSessionId(String),

    /// A session was modified, but no secret key is configured, so there is
    /// no way to issue a verifiable cookie for it. Applications that never
    /// touch session state run fine without a secret key; mutating state
    /// without one is a configuration error.
    #[error("a session was modified, but no secret key is configured")]
    MissingSecretKey,

    /// The session payload could not be serialized or deserialized.
    #[error("session payload codec failure")]
    Payload(#[from] serde_json::Error),

    /// The store backend failed. A plain miss is handled where it occurs;
    /// this variant propagates because backend outages must not be mistaken
    /// for absent sessions.
    #[error("session store failure")]
    Store(#[source] StoreError),
}

/// Errors of the [`SessionStore`](crate::SessionStore) backend contract.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No value is stored under the given key.
    #[error("no value stored under key {0:?}")]
    NotFound(String),

    /// Any other backend failure, e.g. lost connectivity.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
