//! Service API client (merchant backend → Payrail server).
//!
//! Requests are authenticated with the merchant API key in the
//! `X-Payrail-Secret` header.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::merchants::{PredictVaultQuery, PredictVaultResponse};
use crate::session::API_KEY_HEADER;

#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl ServiceClient {
    /// * `base_url` – root URL of the Payrail server.
    /// * `api_key` – the `sk_live_…` key issued at signup.
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `GET /api/v1/vaults/predict` – the deposit vault address a subscriber
    /// would fund for a plan. Nothing is recorded.
    pub async fn predict_vault(
        &self,
        query: &PredictVaultQuery,
    ) -> Result<PredictVaultResponse, ClientError> {
        let url = self.base_url.join("/api/v1/vaults/predict")?;
        let resp = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await?;
        parse_response(resp).await
    }
}
