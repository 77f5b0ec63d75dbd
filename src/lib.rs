//! Server-side HTTP sessions backed by a key-value store.
//!
//! Instead of shipping session data to the client, this crate keeps it in a
//! pluggable key-value backend and puts only an opaque, signed identifier in
//! the cookie. The [`SessionManager`] reconstructs a [`Session`] from an
//! incoming cookie value, persists changed sessions back to the store, and
//! tells the caller what to set as the outgoing cookie.
//!
//! # Change tracking
//!
//! Changes are tracked automatically. Whenever session data or permanence is
//! mutated, the session is marked as modified. Only modified sessions are
//! written to the store and only they produce a cookie, so a request that
//! merely reads its session performs zero store writes. The manager decides
//! whether the cookie should be set, hence [`SessionManager::save`] returns a
//! [`SessionCookieCommand`].
//!
//! # Security
//!
//! Cookie values are signed with HMAC-SHA256 under a configured secret key;
//! a tampered cookie is silently treated like an absent one and answered
//! with a fresh anonymous session. Session identifiers embed their creation
//! time, so stale cookies are rejected at open and expired store entries can
//! be swept in batch with [`SessionManager::cleanup`]. To defeat session
//! fixation, [`SessionManager::regenerate`] retires the current identifier
//! immediately and mints a new one on the next save; call it whenever a
//! session crosses a trust boundary, e.g. on login.
//!
//! # Example
//!
//! ```
//! use kv_session::{MemoryStore, SessionConfig, SessionCookieCommand, SessionManager};
//!
//! # fn main() -> kv_session::Result {
//! # async_std::task::block_on(async {
//! let config = SessionConfig::new().with_secret_key(b"dev key".to_vec());
//! let mut manager = SessionManager::new(MemoryStore::new(), config);
//!
//! // A request without a cookie opens a fresh, empty session.
//! let mut session = manager.open(None).await?;
//! assert!(session.is_new());
//! session.insert("user", "alice")?;
//!
//! // Saving the modified session persists it and yields the signed cookie value.
//! let SessionCookieCommand::Set { cookie_value, .. } = manager.save(&mut session).await? else {
//!     unreachable!("modified sessions always set the cookie");
//! };
//!
//! // The next request presents the cookie and gets the same data back.
//! let session = manager.open(Some(&cookie_value)).await?;
//! assert_eq!(session.get_as::<String>("user").as_deref(), Some("alice"));
//! #
//! # Ok(()) }) }
//! ```
#![forbid(unsafe_code)]
#![deny(
    future_incompatible,
    missing_debug_implementations,
    nonstandard_style,
    missing_docs,
    unreachable_pub,
    missing_copy_implementations,
    unused_qualifications
)]

mod config;
mod error;
mod memory_store;
mod session;
mod session_id;
mod session_manager;
mod signer;
mod store;

pub use config::{CookieOptions, SessionConfig};
pub use error::{Error, StoreError};
pub use memory_store::{MemoryStore, Operation};
pub use session::Session;
pub use session_id::SessionId;
pub use session_manager::{SessionCookieCommand, SessionManager};
pub use signer::CookieSigner;
pub use store::SessionStore;

/// A `Result` with this crate's [`Error`] and a default return type of `()`.
pub type Result<T = ()> = std::result::Result<T, Error>;
