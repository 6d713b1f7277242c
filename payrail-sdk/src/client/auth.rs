//! Auth API client (merchant dashboard → Payrail server).

use reqwest::Client;
use url::Url;

use super::{ClientError, Session, parse_response};
use crate::objects::auth::{LoginRequest, SignupRequest, SignupResponse, TokenResponse};

/// Typed HTTP client for the **Auth API**.
///
/// Both calls are unauthenticated; on success the returned token is stored
/// in the supplied [`Session`].
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: Client,
    base_url: Url,
}

impl AuthClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /api/v1/auth/signup` – create a merchant account.
    pub async fn signup(
        &self,
        request: &SignupRequest,
        session: &Session,
    ) -> Result<SignupResponse, ClientError> {
        let url = self.base_url.join("/api/v1/auth/signup")?;
        let resp = self.http.post(url).json(request).send().await?;
        let created: SignupResponse = parse_response(resp).await?;
        session.set(created.access_token.clone());
        Ok(created)
    }

    /// `POST /api/v1/auth/login` – exchange credentials for a session token.
    pub async fn login(
        &self,
        request: &LoginRequest,
        session: &Session,
    ) -> Result<TokenResponse, ClientError> {
        let url = self.base_url.join("/api/v1/auth/login")?;
        let resp = self.http.post(url).json(request).send().await?;
        let token: TokenResponse = parse_response(resp).await?;
        session.set(token.access_token.clone());
        Ok(token)
    }
}
