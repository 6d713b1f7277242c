//! HTTP clients for the Payrail APIs.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod auth;
mod checkout;
mod merchant;
mod service;

pub use auth::AuthClient;
pub use checkout::CheckoutClient;
pub use merchant::MerchantClient;
pub use service::ServiceClient;

use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::StatusCode;

/// Errors produced by the SDK HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// The session token was rejected. The [`Session`] has been cleared.
    #[error("session expired, log in again")]
    SessionExpired,

    /// No session token is present.
    #[error("not logged in")]
    NotLoggedIn,

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// A merchant's dashboard session.
///
/// The handle is cheap to clone; all clones share the same token. A client
/// that receives `401 Unauthorized` clears it, and every clone observes the
/// logout.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Arc<Mutex<Option<String>>>,
}

impl Session {
    /// A session that is not logged in.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(Mutex::new(Some(token.into()))),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn token(&self) -> Option<String> {
        self.guard().clone()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.guard() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.guard() = None;
    }

    pub fn is_logged_in(&self) -> bool {
        self.guard().is_some()
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
