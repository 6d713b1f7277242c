//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `MerchantSession`: verifies the bearer session token issued at login
//!   and loads the merchant it belongs to (used by the merchant API).
//! - `ApiKeyMerchant`: resolves the `X-Payrail-Secret` API key to its
//!   merchant (used by the service API).
//!
//! Token and key primitives live in [`payrail_sdk::session`].

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use kanau::processor::Processor;
use payrail_core::entities::merchants::{
    GetMerchantByApiKeyHash, GetMerchantByUserId, Merchant,
};
use payrail_sdk::session::{API_KEY_HEADER, SessionClaims, SessionTokenError, hash_api_key};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// MerchantSession: merchant API authentication via bearer token
// ---------------------------------------------------------------------------

/// The merchant behind a valid session token.
///
/// # Header format
///
/// ```text
/// Authorization: Bearer {user_id}.{expires_at}.{base32_signature}
/// ```
pub struct MerchantSession(pub Merchant);

/// Errors returned by the [`MerchantSession`] extractor.
#[derive(Debug)]
pub enum MerchantSessionError {
    MissingToken,
    InvalidToken,
    Expired,
    UnknownMerchant,
    Database(sqlx::Error),
}

impl From<SessionTokenError> for MerchantSessionError {
    fn from(err: SessionTokenError) -> Self {
        match err {
            SessionTokenError::Expired => Self::Expired,
            SessionTokenError::InvalidFormat
            | SessionTokenError::InvalidBase64
            | SessionTokenError::SignatureMismatch => Self::InvalidToken,
        }
    }
}

impl IntoResponse for MerchantSessionError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            MerchantSessionError::MissingToken => {
                (StatusCode::UNAUTHORIZED, "missing bearer token")
            }
            MerchantSessionError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "invalid session token")
            }
            MerchantSessionError::Expired => (StatusCode::UNAUTHORIZED, "session expired"),
            MerchantSessionError::UnknownMerchant => {
                (StatusCode::UNAUTHORIZED, "no merchant for this session")
            }
            MerchantSessionError::Database(e) => {
                tracing::error!(error = %e, "Session lookup database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };
        (status, message).into_response()
    }
}

/// Extract the token from an `Authorization: Bearer …` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for MerchantSession {
    type Rejection = MerchantSessionError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(MerchantSessionError::MissingToken)?
            .to_str()
            .map_err(|_| MerchantSessionError::InvalidToken)?;
        let token = bearer_token(header).ok_or(MerchantSessionError::InvalidToken)?;

        let auth = state.config.auth.read().await;
        let claims = SessionClaims::verify(token, auth.secret_bytes())?;
        drop(auth);

        let merchant = state
            .processor()
            .process(GetMerchantByUserId {
                user_id: claims.user_id,
            })
            .await
            .map_err(MerchantSessionError::Database)?
            .ok_or(MerchantSessionError::UnknownMerchant)?;

        Ok(MerchantSession(merchant))
    }
}

// ---------------------------------------------------------------------------
// ApiKeyMerchant: service API authentication via API key
// ---------------------------------------------------------------------------

/// The merchant owning the API key in the `X-Payrail-Secret` header.
pub struct ApiKeyMerchant(pub Merchant);

/// Errors returned by the [`ApiKeyMerchant`] extractor.
#[derive(Debug)]
pub enum ApiKeyError {
    MissingKey,
    InvalidKey,
    Database(sqlx::Error),
}

impl IntoResponse for ApiKeyError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiKeyError::MissingKey => (StatusCode::UNAUTHORIZED, "missing X-Payrail-Secret header"),
            ApiKeyError::InvalidKey => (StatusCode::UNAUTHORIZED, "invalid API key"),
            ApiKeyError::Database(e) => {
                tracing::error!(error = %e, "API key lookup database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for ApiKeyMerchant {
    type Rejection = ApiKeyError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get(API_KEY_HEADER)
            .ok_or(ApiKeyError::MissingKey)?
            .to_str()
            .map_err(|_| ApiKeyError::InvalidKey)?;

        let merchant = state
            .processor()
            .process(GetMerchantByApiKeyHash {
                api_key_hash: hash_api_key(api_key.trim()),
            })
            .await
            .map_err(ApiKeyError::Database)?
            .ok_or(ApiKeyError::InvalidKey)?;

        Ok(ApiKeyMerchant(merchant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn test_token_errors_are_unauthorized() {
        for err in [
            SessionTokenError::InvalidFormat,
            SessionTokenError::SignatureMismatch,
            SessionTokenError::Expired,
        ] {
            let response = MerchantSessionError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
