use chrono::Duration;

/// Process-wide session configuration, read-only once the
/// [`SessionManager`](crate::SessionManager) has been constructed.
///
/// Passing configuration in explicitly (instead of looking it up from some
/// ambient application state) keeps the lifecycle manager free of hidden
/// coupling and easy to test.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use kv_session::SessionConfig;
///
/// let config = SessionConfig::new()
///     .with_secret_key(b"dev key".to_vec())
///     .with_lifetime(Duration::hours(12));
/// assert_eq!(config.key_bits(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub(crate) secret_key: Option<Vec<u8>>,
    pub(crate) key_bits: u32,
    pub(crate) lifetime: Duration,
    pub(crate) cookie: CookieOptions,
}

impl SessionConfig {
    /// Default configuration: no secret key, 64 bit session ids, a lifetime
    /// of 31 days and default cookie attributes.
    ///
    /// Without a secret key the application runs, but sessions are unusable:
    /// opening always yields a fresh empty session and saving a modified one
    /// fails with [`Error::MissingSecretKey`](crate::Error::MissingSecretKey).
    pub fn new() -> Self {
        Self {
            secret_key: None,
            key_bits: 64,
            lifetime: Duration::days(31),
            cookie: CookieOptions::default(),
        }
    }

    /// Set the secret key used to sign and verify session cookies.
    pub fn with_secret_key(mut self, secret_key: impl Into<Vec<u8>>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Set the width of the random part of minted session ids, in bits.
    /// Values outside 1..=128 are clamped.
    pub fn with_key_bits(mut self, key_bits: u32) -> Self {
        self.key_bits = key_bits.clamp(1, 128);
        self
    }

    /// Set the session lifetime. It bounds all three expiry mechanisms: the
    /// open-time staleness check, the cookie expiry of permanent sessions,
    /// and the sweeper cutoff.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the attributes of the session cookie.
    pub fn with_cookie(mut self, cookie: CookieOptions) -> Self {
        self.cookie = cookie;
        self
    }

    /// Width of the random part of minted session ids, in bits.
    pub fn key_bits(&self) -> u32 {
        self.key_bits
    }

    /// The configured session lifetime.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// The configured cookie attributes.
    pub fn cookie(&self) -> &CookieOptions {
        &self.cookie
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Attributes of the session cookie, passed through unmodified to whatever
/// writes the response. This crate never sets cookies itself; the hosting
/// framework combines these with the
/// [`SessionCookieCommand`](crate::SessionCookieCommand) returned by save.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    /// Name of the session cookie.
    pub name: String,
    /// The domain attribute, if any.
    pub domain: Option<String>,
    /// The path attribute.
    pub path: String,
    /// Whether to set the Secure flag.
    pub secure: bool,
    /// Whether to set the HttpOnly flag.
    pub http_only: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            domain: None,
            path: "/".to_string(),
            secure: false,
            http_only: true,
        }
    }
}
