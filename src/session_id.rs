use crate::error::Error;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;

/// A server-side session identifier: a random id paired with the UTC second
/// the session was created.
///
/// The encoded form `<id-hex>_<created-unix-hex>` doubles as the store key
/// and, once signed, as the cookie value. Embedding the creation time in the
/// identifier lets both the lifecycle manager and the expiry sweeper decide
/// expiry without loading the stored payload.
///
/// # Example
///
/// ```rust
/// # use kv_session::SessionId;
/// # fn main() -> kv_session::Result {
/// use chrono::{TimeZone, Utc};
///
/// let id = SessionId::new(0x59034, Utc.timestamp_opt(0x4e184a07, 0).unwrap());
/// assert_eq!(id.encode(), "59034_4e184a07");
/// assert_eq!(SessionId::decode("59034_4e184a07")?, id);
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SessionId {
    id: u128,
    created: DateTime<Utc>,
}

impl SessionId {
    /// Create a session id from parts. `created` is truncated to second
    /// precision, as subseconds do not survive encoding. Timestamps before
    /// the UNIX epoch are not representable in the encoded form.
    pub fn new(id: u128, created: DateTime<Utc>) -> Self {
        let created = created - Duration::nanoseconds(i64::from(created.timestamp_subsec_nanos()));
        Self { id, created }
    }

    /// Mint a fresh identifier with a `bits`-wide random id (clamped to
    /// 1..=128) and `now` as the creation time.
    ///
    /// Every mint draws fresh from `rng`; identifiers are never reused.
    /// Make sure to use a cryptographically secure random generator, e.g.
    /// [`rand::rngs::OsRng`].
    pub fn mint(rng: &mut impl Rng, bits: u32, now: DateTime<Utc>) -> Self {
        let bits = bits.clamp(1, 128);
        let id = rng.gen::<u128>() >> (128 - bits);
        Self::new(id, now)
    }

    /// The random part of the identifier.
    pub fn id(&self) -> u128 {
        self.id
    }

    /// When the session was created, at second precision.
    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    /// Encode as `<id-hex>_<created-unix-hex>`, lowercase.
    pub fn encode(&self) -> String {
        format!("{:x}_{:x}", self.id, self.created.timestamp())
    }

    /// Decode an identifier previously produced by [`encode`](Self::encode).
    ///
    /// Accepts exactly two non-empty lowercase hex fields joined by a single
    /// `_`; anything else fails with [`Error::MalformedSessionId`]. The check
    /// is strict on purpose: store keys are validated with this same routine
    /// during sweeping, and `from_str_radix` alone would admit sign prefixes
    /// and uppercase digits.
    pub fn decode(input: &str) -> Result<Self, Error> {
        let malformed = || Error::MalformedSessionId(input.to_string());

        let (id_hex, created_hex) = input.split_once('_').ok_or_else(malformed)?;
        if !is_lower_hex(id_hex) || !is_lower_hex(created_hex) {
            return Err(malformed());
        }

        let id = u128::from_str_radix(id_hex, 16).map_err(|_| malformed())?;
        let created_secs = i64::from_str_radix(created_hex, 16).map_err(|_| malformed())?;
        let created = Utc
            .timestamp_opt(created_secs, 0)
            .single()
            .ok_or_else(malformed)?;

        Ok(Self { id, created })
    }

    /// Report whether the session has outlived `lifetime`.
    ///
    /// `now` is injected so expiry can be tested deterministically; callers
    /// outside tests pass [`Utc::now`].
    pub fn has_expired(&self, lifetime: Duration, now: DateTime<Utc>) -> bool {
        now > self.created + lifetime
    }
}

fn is_lower_hex(field: &str) -> bool {
    !field.is_empty() && field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
