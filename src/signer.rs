use crate::error::Error;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::{Debug, Formatter};

type HmacSha256 = Hmac<Sha256>;

/// Separates the signed value from its signature. Must not occur in encoded
/// session ids, which use `_` internally.
const SEPARATOR: char = '.';

/// Signs cookie values with HMAC-SHA256 under the configured secret key, and
/// verifies them on the way back in.
///
/// The token format is `<value>.<signature>` with the signature transported
/// as unpadded base64url. Unpadded encoding means every character of the
/// token is covered: flipping any one of them, value or signature alike,
/// fails verification.
///
/// # Example
///
/// ```rust
/// # use kv_session::CookieSigner;
/// # fn main() -> kv_session::Result {
/// let signer = CookieSigner::new(b"secret".to_vec());
/// let token = signer.sign("59034_4e184a07");
/// assert_eq!(signer.unsign(&token)?, "59034_4e184a07");
/// assert!(CookieSigner::new(b"other".to_vec()).unsign(&token).is_err());
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct CookieSigner {
    key: Vec<u8>,
}

impl CookieSigner {
    /// Create a signer keyed by `secret_key`. Keys of any length are
    /// accepted; HMAC handles the padding or hashing internally.
    pub fn new(secret_key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: secret_key.into(),
        }
    }

    /// Append a signature to `value`, producing the cookie token.
    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.keyed_mac();
        mac.update(value.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        let mut token = String::with_capacity(value.len() + 1 + signature.len());
        token.push_str(value);
        token.push(SEPARATOR);
        token.push_str(&signature);
        token
    }

    /// Verify a token produced by [`sign`](Self::sign) and recover the value.
    ///
    /// A missing separator, undecodable signature, or signature mismatch all
    /// fail with [`Error::Tampered`]; the error carries no detail about which
    /// check failed. Signature comparison runs in constant time.
    pub fn unsign(&self, token: &str) -> Result<String, Error> {
        let (value, signature) = token.rsplit_once(SEPARATOR).ok_or(Error::Tampered)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::Tampered)?;

        let mut mac = self.keyed_mac();
        mac.update(value.as_bytes());
        mac.verify_slice(&signature).map_err(|_| Error::Tampered)?;

        Ok(value.to_string())
    }

    fn keyed_mac(&self) -> HmacSha256 {
        match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
        }
    }
}

impl Debug for CookieSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}
