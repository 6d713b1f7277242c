//! Merchant credentials.
//!
//! Two kinds of credential exist:
//!
//! * **Session tokens** for the dashboard API, sent as
//!   `Authorization: Bearer {token}`. The wire format is
//!
//!   ```text
//!   {user_id}.{expires_at}.{base64_signature}
//!   ```
//!
//!   where the signature is `HMAC-SHA256("{user_id}.{expires_at}", secret)`.
//!
//! * **API keys** (`sk_live_…`) for server-to-server calls, sent in the
//!   [`API_KEY_HEADER`] header. Only their SHA-256 digest is stored.

use uuid::Uuid;

/// Header carrying a merchant API key.
pub const API_KEY_HEADER: &str = "X-Payrail-Secret";

/// Token type reported alongside every issued session token.
pub const TOKEN_TYPE: &str = "bearer";

/// Lifetime of a session token (in seconds).
pub const SESSION_TTL: i64 = 24 * 60 * 60;

const API_KEY_PREFIX: &str = "sk_live_";
const WEBHOOK_SECRET_PREFIX: &str = "whsec_";

#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid signature")]
    SignatureMismatch,
    #[error("token expired")]
    Expired,
}

impl From<ring::error::Unspecified> for SessionTokenError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// The authenticated content of a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub expires_at: i64,
}

impl SessionClaims {
    /// Claims for `user_id` that expire [`SESSION_TTL`] seconds from now.
    pub fn new(user_id: Uuid) -> Self {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        Self {
            user_id,
            expires_at: now + SESSION_TTL,
        }
    }

    fn payload(&self) -> String {
        format!("{}.{}", self.user_id, self.expires_at)
    }

    /// Sign the claims into a bearer token.
    pub fn sign(&self, key: &[u8]) -> String {
        let payload = self.payload();
        let sig = ring::hmac::sign(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
            payload.as_bytes(),
        );
        format!(
            "{}.{}",
            payload,
            fast32::base64::RFC4648_NOPAD.encode(sig.as_ref())
        )
    }

    /// Parse a bearer token and check its signature and expiry.
    pub fn verify(token: &str, key: &[u8]) -> Result<Self, SessionTokenError> {
        Self::verify_at(token, key, time::OffsetDateTime::now_utc().unix_timestamp())
    }

    fn verify_at(token: &str, key: &[u8], now: i64) -> Result<Self, SessionTokenError> {
        let (payload, signature) = token
            .rsplit_once('.')
            .ok_or(SessionTokenError::InvalidFormat)?;
        let (user_id, expires_at) = payload
            .split_once('.')
            .ok_or(SessionTokenError::InvalidFormat)?;
        let user_id: Uuid = user_id
            .parse()
            .map_err(|_| SessionTokenError::InvalidFormat)?;
        let expires_at: i64 = expires_at
            .parse()
            .map_err(|_| SessionTokenError::InvalidFormat)?;
        let signature = fast32::base64::RFC4648_NOPAD
            .decode_str(signature)
            .map_err(|_| SessionTokenError::InvalidBase64)?;

        ring::hmac::verify(
            &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
            payload.as_bytes(),
            &signature,
        )?;
        if now >= expires_at {
            return Err(SessionTokenError::Expired);
        }
        Ok(Self {
            user_id,
            expires_at,
        })
    }
}

/// Generate a fresh merchant API key.
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::random();
    format!("{API_KEY_PREFIX}{}", hex::encode(bytes))
}

/// SHA-256 hex digest of an API key, as stored in the database.
pub fn hash_api_key(api_key: &str) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, api_key.as_bytes());
    hex::encode(digest.as_ref())
}

/// Generate a fresh webhook signing secret.
pub fn generate_webhook_secret() -> String {
    format!("{WEBHOOK_SECRET_PREFIX}{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"session-signing-key";

    #[test]
    fn test_token_verifies() {
        let claims = SessionClaims::new(Uuid::new_v4());
        let token = claims.sign(KEY);
        let verified = SessionClaims::verify(&token, KEY).unwrap();
        assert_eq!(verified, claims);
    }

    #[test]
    fn test_token_wrong_key() {
        let token = SessionClaims::new(Uuid::new_v4()).sign(KEY);
        assert!(matches!(
            SessionClaims::verify(&token, b"other-key"),
            Err(SessionTokenError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_token_tampered_expiry() {
        let claims = SessionClaims::new(Uuid::new_v4());
        let token = claims.sign(KEY);
        let sig = token.rsplit_once('.').unwrap().1;
        let forged = format!("{}.{}.{}", claims.user_id, claims.expires_at + 3600, sig);
        assert!(matches!(
            SessionClaims::verify(&forged, KEY),
            Err(SessionTokenError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_token_expired() {
        let claims = SessionClaims {
            user_id: Uuid::new_v4(),
            expires_at: 1_000,
        };
        let token = claims.sign(KEY);
        assert!(matches!(
            SessionClaims::verify_at(&token, KEY, 1_000),
            Err(SessionTokenError::Expired)
        ));
        assert!(SessionClaims::verify_at(&token, KEY, 999).is_ok());
    }

    #[test]
    fn test_token_garbage() {
        assert!(matches!(
            SessionClaims::verify("not-a-token", KEY),
            Err(SessionTokenError::InvalidFormat)
        ));
        assert!(matches!(
            SessionClaims::verify("abc.123.sig", KEY),
            Err(SessionTokenError::InvalidFormat)
        ));
    }

    #[test]
    fn test_api_key_shape_and_hash() {
        let key = generate_api_key();
        assert!(key.starts_with("sk_live_"));
        assert_eq!(key.len(), "sk_live_".len() + 64);
        assert_ne!(key, generate_api_key());

        // sha256("abc")
        assert_eq!(
            hash_api_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_webhook_secret_shape() {
        let secret = generate_webhook_secret();
        assert!(secret.starts_with("whsec_"));
        assert_eq!(secret.len(), "whsec_".len() + 32);
    }
}
