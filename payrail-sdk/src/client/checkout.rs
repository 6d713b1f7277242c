//! Public checkout and portal API client.
//!
//! Used by the subscribe page and the subscriber portal. None of these
//! endpoints require merchant credentials.

use reqwest::Client;
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::plans::CheckoutPlanResponse;
use crate::objects::subscriptions::{
    AttachVaultRequest, CancelSubscriptionRequest, DepositVaultResponse, OpenSubscriptionRequest,
    PortalSubscription, SubscriptionDetail, SubscriptionResponse, VaultCheckoutRequest,
    VaultCheckoutResponse,
};

#[derive(Debug, Clone)]
pub struct CheckoutClient {
    http: Client,
    base_url: Url,
}

impl CheckoutClient {
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

    /// `GET /api/v1/checkout/plans/{plan_id}` – plan with its merchant name.
    pub async fn plan(&self, plan_id: i64) -> Result<CheckoutPlanResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/checkout/plans/{plan_id}"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/checkout/plans/{plan_id}/vault` – let the server run
    /// the whole vault checkout.
    pub async fn vault_checkout(
        &self,
        plan_id: i64,
        request: &VaultCheckoutRequest,
    ) -> Result<VaultCheckoutResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/checkout/plans/{plan_id}/vault"))?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/checkout/plans/{plan_id}/subscriptions` – record a
    /// subscription created by a client-driven checkout.
    pub async fn open_subscription(
        &self,
        plan_id: i64,
        request: &OpenSubscriptionRequest,
    ) -> Result<SubscriptionResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/checkout/plans/{plan_id}/subscriptions"))?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/checkout/subscriptions/{id}/vault` – attach the derived
    /// vault to a pending vault-mode subscription.
    pub async fn attach_vault(
        &self,
        subscription_id: Uuid,
        request: &AttachVaultRequest,
    ) -> Result<DepositVaultResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/checkout/subscriptions/{subscription_id}/vault"))?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/checkout/subscriptions/{id}`
    pub async fn subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<SubscriptionDetail, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/checkout/subscriptions/{subscription_id}"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/v1/portal/subscriptions?subscriber=…`
    pub async fn portal_subscriptions(
        &self,
        subscriber_address: &str,
    ) -> Result<Vec<PortalSubscription>, ClientError> {
        let url = self.base_url.join("/api/v1/portal/subscriptions")?;
        let resp = self
            .http
            .get(url)
            .query(&[("subscriber", subscriber_address)])
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/v1/portal/subscriptions/{id}/cancel`
    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        request: &CancelSubscriptionRequest,
    ) -> Result<SubscriptionResponse, ClientError> {
        let url = self
            .base_url
            .join(&format!("/api/v1/portal/subscriptions/{subscription_id}/cancel"))?;
        let resp = self.http.post(url).json(request).send().await?;
        parse_response(resp).await
    }
}
