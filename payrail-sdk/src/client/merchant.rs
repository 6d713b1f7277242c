//! Merchant dashboard API client.
//!
//! Every request carries `Authorization: Bearer {token}` from the shared
//! [`Session`]. A `401` response clears the session and surfaces as
//! [`ClientError::SessionExpired`] so the caller can send the user back to
//! the login screen.

use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use super::{ClientError, Session, parse_response};
use crate::objects::merchants::{DashboardStats, MerchantResponse};
use crate::objects::plans::{CreatePlanRequest, PlanResponse};
use crate::objects::subscriptions::MerchantSubscription;

#[derive(Debug, Clone)]
pub struct MerchantClient {
    http: Client,
    base_url: Url,
    session: Session,
}

impl MerchantClient {
    pub fn new(base_url: Url, session: Session) -> Self {
        Self {
            http: Client::new(),
            base_url,
            session,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let token = self.session.token().ok_or(ClientError::NotLoggedIn)?;
        let resp = request.bearer_auth(token).send().await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            self.session.clear();
            return Err(ClientError::SessionExpired);
        }
        parse_response(resp).await
    }

    /// `GET /api/v1/merchants/me`
    pub async fn me(&self) -> Result<MerchantResponse, ClientError> {
        let url = self.base_url.join("/api/v1/merchants/me")?;
        self.send(self.http.get(url)).await
    }

    /// `GET /api/v1/merchants/me/stats`
    pub async fn stats(&self) -> Result<DashboardStats, ClientError> {
        let url = self.base_url.join("/api/v1/merchants/me/stats")?;
        self.send(self.http.get(url)).await
    }

    /// `GET /api/v1/merchants/me/plans`
    pub async fn plans(&self) -> Result<Vec<PlanResponse>, ClientError> {
        let url = self.base_url.join("/api/v1/merchants/me/plans")?;
        self.send(self.http.get(url)).await
    }

    /// `POST /api/v1/merchants/me/plans`
    pub async fn create_plan(
        &self,
        request: &CreatePlanRequest,
    ) -> Result<PlanResponse, ClientError> {
        let url = self.base_url.join("/api/v1/merchants/me/plans")?;
        self.send(self.http.post(url).json(request)).await
    }

    /// `POST /api/v1/merchants/me/plans/{plan_id}/deactivate`
    pub async fn deactivate_plan(&self, plan_id: i64) -> Result<PlanResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/merchants/me/plans/{plan_id}/deactivate"))?;
        self.send(self.http.post(url)).await
    }

    /// `GET /api/v1/merchants/me/subscriptions`
    pub async fn subscriptions(&self) -> Result<Vec<MerchantSubscription>, ClientError> {
        let url = self.base_url.join("/api/v1/merchants/me/subscriptions")?;
        self.send(self.http.get(url)).await
    }
}
