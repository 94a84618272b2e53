//! Cookie value format: `base64url(session_id).base64url(hmac_sha256(secret, session_id))`.
//!
//! Only the id is signed; the session document never leaves the store.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::types::{SessionError, SessionId};

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies session cookie values with the configured secret.
#[derive(Clone)]
pub struct CookieSigner {
    secret: Vec<u8>,
}

impl CookieSigner {
    /// Creates a signer for `secret`.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, SessionError> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| SessionError::InvalidKey)
    }

    /// Produces the cookie value carrying `id`.
    pub fn sign(&self, id: &SessionId) -> Result<String, SessionError> {
        let mut mac = self.mac()?;
        mac.update(id.as_str().as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(id.as_str().as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Extracts the session id from a cookie value, or `None` if it was not
    /// signed with this secret.
    pub fn verify(&self, cookie_value: &str) -> Option<SessionId> {
        let (id_part, sig_part) = cookie_value.split_once('.')?;

        let id = String::from_utf8(URL_SAFE_NO_PAD.decode(id_part).ok()?).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(sig_part).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(id.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(SessionId::from_verified(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = CookieSigner::new("thisshouldbeabettersecret!");
        let id = SessionId::generate();

        let cookie = signer.sign(&id).unwrap();
        assert_eq!(signer.verify(&cookie), Some(id));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let id = SessionId::generate();
        let cookie = CookieSigner::new("secret-a").sign(&id).unwrap();

        assert_eq!(CookieSigner::new("secret-b").verify(&cookie), None);
    }

    #[test]
    fn test_tampered_id_fails() {
        let signer = CookieSigner::new("secret");
        let cookie = signer.sign(&SessionId::generate()).unwrap();
        let (_, sig) = cookie.split_once('.').unwrap();

        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(b"someone-elses-id"), sig);
        assert_eq!(signer.verify(&forged), None);
    }

    #[test]
    fn test_malformed_values_fail() {
        let signer = CookieSigner::new("secret");

        assert_eq!(signer.verify(""), None);
        assert_eq!(signer.verify("nodothere"), None);
        assert_eq!(signer.verify("!!!.!!!"), None);
    }
}
