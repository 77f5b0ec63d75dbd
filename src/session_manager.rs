use crate::config::SessionConfig;
use crate::error::{Error, StoreError};
use crate::session::Session;
use crate::session_id::SessionId;
use crate::signer::CookieSigner;
use crate::store::SessionStore;
use crate::Result;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;

/// Drives the lifecycle of server-side sessions: opening them from a request
/// cookie, persisting them to the backing store, destroying and regenerating
/// them, and sweeping out expired entries.
///
/// The manager owns the store, the configuration and the signing key. It
/// deliberately knows nothing about HTTP: the caller hands in the raw cookie
/// value on open, and receives a [`SessionCookieCommand`] from save telling
/// it what to write back. Per request the session moves through open →
/// (modified | unmodified) → saved; unmodified sessions complete the cycle
/// without a single store write or cookie header.
#[derive(Debug)]
pub struct SessionManager<Store, R = OsRng> {
    store: Store,
    config: SessionConfig,
    signer: Option<CookieSigner>,
    rng: R,
}

/// What the caller should do with the session cookie after a save.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SessionCookieCommand {
    /// Set the session cookie to `cookie_value`, with the attributes from
    /// [`SessionConfig::cookie`](crate::SessionConfig::cookie).
    Set {
        /// The signed cookie value.
        cookie_value: String,
        /// Explicit cookie expiry for permanent sessions; `None` means a
        /// browser-session cookie without an expiry attribute.
        expires: Option<DateTime<Utc>>,
    },
    /// Leave the cookie alone. Returned whenever the session was not
    /// modified, including after a destroy.
    DoNothing,
}

/// The one place where all silently-recovered cookie failures collapse:
/// tampering, malformed ids, expiry and store misses each resolve to
/// `Absent`, which `open` answers with a fresh empty session.
enum Resolved {
    Live {
        sid: String,
        payload: HashMap<String, Value>,
    },
    Absent,
}

impl<Store: SessionStore> SessionManager<Store> {
    /// Create a session manager backed by `store`, drawing session ids from
    /// the operating system's secure random source.
    pub fn new(store: Store, config: SessionConfig) -> Self {
        Self::new_with_rng(store, config, OsRng)
    }
}

impl<Store: SessionStore, R: Rng> SessionManager<Store, R> {
    /// Create a session manager with an explicit random source for session
    /// id minting.
    ///
    /// Make sure to use a cryptographically secure random generator in
    /// production; predictable ids make sessions guessable. Injecting a
    /// seeded generator is useful in tests.
    pub fn new_with_rng(store: Store, config: SessionConfig, rng: R) -> Self {
        let signer = config.secret_key.as_deref().map(CookieSigner::new);
        Self {
            store,
            config,
            signer,
            rng,
        }
    }

    /// The configuration this manager was constructed with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A reference to the backing store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// A mutable reference to the backing store.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Consume the manager, returning the backing store.
    pub fn into_store(self) -> Store {
        self.store
    }

    /// Open the session identified by a request's session cookie.
    ///
    /// `cookie` is the raw value of the session cookie, or `None` if the
    /// request carried none. Every condition that makes the cookie unusable
    /// (absence, a bad signature, a malformed identifier, expiry, or a store
    /// miss because the session was destroyed, regenerated or swept) yields
    /// a fresh empty session with [`is_new`](Session::is_new) set, never an
    /// error. A tampered cookie is indistinguishable from an absent one.
    ///
    /// Only genuine trouble surfaces: a store backend failure or an
    /// undeserializable payload.
    ///
    /// If no secret key is configured, the cookie is not even looked at and a
    /// fresh session is returned. The application can run this way for as
    /// long as nothing mutates session state.
    pub async fn open(&self, cookie: Option<&str>) -> Result<Session> {
        let Some(signer) = &self.signer else {
            return Ok(Session::new());
        };
        let Some(cookie) = cookie else {
            return Ok(Session::new());
        };

        match self.resolve_session(signer, cookie).await? {
            Resolved::Live { sid, payload } => Ok(Session::from_store(sid, payload)),
            Resolved::Absent => Ok(Session::new()),
        }
    }

    async fn resolve_session(&self, signer: &CookieSigner, cookie: &str) -> Result<Resolved> {
        let sid = match signer.unsign(cookie) {
            Ok(sid) => sid,
            Err(_) => {
                log::debug!("rejecting session cookie that failed signature verification");
                return Ok(Resolved::Absent);
            }
        };

        let id = match SessionId::decode(&sid) {
            Ok(id) => id,
            Err(_) => {
                log::debug!("rejecting correctly signed but malformed session id");
                return Ok(Resolved::Absent);
            }
        };

        // Also catches the stale cookie of a session that was created
        // non-permanent and made permanent later.
        if id.has_expired(self.config.lifetime, Utc::now()) {
            log::debug!("session {sid} has expired");
            return Ok(Resolved::Absent);
        }

        let raw = match self.store.get(&sid).await {
            Ok(raw) => raw,
            Err(StoreError::NotFound(_)) => {
                log::debug!("session {sid} not found in store");
                return Ok(Resolved::Absent);
            }
            Err(err) => return Err(Error::Store(err)),
        };

        let payload = serde_json::from_slice(&raw)?;
        Ok(Resolved::Live { sid, payload })
    }

    /// Persist a session and report what to do with the cookie.
    ///
    /// Unmodified sessions are not persisted: the call returns
    /// [`SessionCookieCommand::DoNothing`] without touching store or cookie.
    /// Saving the same session twice therefore writes only once, as the first
    /// save clears the modified flag.
    ///
    /// A modified session without an identity (new, or regenerated) gets a
    /// freshly minted id first, which is how regeneration breaks session
    /// fixation. The payload is written under the encoded id, with the
    /// configured lifetime as TTL if the store natively expires entries. The
    /// returned cookie value is the signed id; permanent sessions get an
    /// explicit expiry, others a browser-session cookie.
    ///
    /// Fails with [`Error::MissingSecretKey`] if the session was modified but
    /// no secret key is configured.
    pub async fn save(&mut self, session: &mut Session) -> Result<SessionCookieCommand> {
        if !session.modified {
            return Ok(SessionCookieCommand::DoNothing);
        }
        let Some(signer) = &self.signer else {
            return Err(Error::MissingSecretKey);
        };

        let now = Utc::now();
        let sid = match &session.sid {
            Some(sid) => sid.clone(),
            None => {
                let sid = SessionId::mint(&mut self.rng, self.config.key_bits, now).encode();
                session.sid = Some(sid.clone());
                sid
            }
        };

        let data = serde_json::to_vec(&session.payload)?;
        let ttl_seconds = self
            .store
            .ttl_support()
            .then(|| self.config.lifetime.num_seconds().max(0) as u64);
        self.store
            .put(&sid, &data, ttl_seconds)
            .await
            .map_err(Error::Store)?;

        session.new = false;
        session.modified = false;

        let expires = session.permanent.then(|| now + self.config.lifetime);
        log::debug!("persisted session {sid}");
        Ok(SessionCookieCommand::Set {
            cookie_value: signer.sign(&sid),
            expires,
        })
    }

    /// Destroy a session completely, deleting all keys and removing it from
    /// the store immediately.
    ///
    /// This removes a session for security reasons, e.g. a login stored in it
    /// ceases to exist right away. The client's cookie is left to decay
    /// naturally: a subsequent save sees an unmodified session and writes
    /// nothing, and the next open with the stale cookie falls back to a
    /// fresh session through the store-miss path.
    pub async fn destroy(&mut self, session: &mut Session) -> Result {
        session.payload.clear();

        if let Some(sid) = session.sid.take() {
            self.store.delete(&sid).await.map_err(Error::Store)?;
            log::debug!("destroyed session {sid}");
        }

        session.modified = false;
        session.new = false;
        Ok(())
    }

    /// Give the session a new identity, invalidating the old one immediately.
    ///
    /// Call this whenever a session crosses a trust boundary, typically on
    /// login: an identifier an attacker planted on the victim beforehand
    /// (session fixation) stops working the moment the old store entry is
    /// deleted here. The session is marked modified unconditionally, so the
    /// next save mints a fresh id and persists even if the payload is
    /// unchanged. At no point do two store entries for it exist.
    pub async fn regenerate(&mut self, session: &mut Session) -> Result {
        if let Some(sid) = session.sid.take() {
            self.store.delete(&sid).await.map_err(Error::Store)?;
            log::debug!("regenerating session, retired id {sid}");
        }

        session.modified = true;
        Ok(())
    }

    /// Remove all expired sessions from the store, returning how many were
    /// deleted.
    ///
    /// Walks every store key; keys that do not have the session id shape are
    /// skipped, since the store may hold unrelated data. A session counts as
    /// expired once the creation time embedded in its key is more than the
    /// configured lifetime in the past; permanence makes no difference here.
    ///
    /// Run this periodically from a job when the backend has no native TTL;
    /// nothing calls it automatically.
    pub async fn cleanup(&mut self) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        for key in self.store.keys().await.map_err(Error::Store)? {
            let Ok(id) = SessionId::decode(&key) else {
                continue;
            };
            if id.has_expired(self.config.lifetime, now) {
                self.store.delete(&key).await.map_err(Error::Store)?;
                removed += 1;
            }
        }

        log::debug!("expiry sweep removed {removed} sessions");
        Ok(removed)
    }
}
