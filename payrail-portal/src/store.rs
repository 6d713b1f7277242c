//! [`CheckoutStore`] over the server's public checkout API.
//!
//! Writes go through the server's own checks: a wallet subscription is only
//! accepted once active on-chain, and a vault is only accepted when its
//! address matches the engine's derivation.

use async_trait::async_trait;
use payrail_core::checkout::{CheckoutStore, StoreError};
use payrail_core::entities::deposit_vaults::{DepositVault, InsertDepositVault};
use payrail_core::entities::plans::Plan;
use payrail_core::entities::subscriptions::{InsertSubscription, Subscription};
use payrail_sdk::client::{CheckoutClient, ClientError};
use payrail_sdk::objects::{
    ActivationMode as SdkMode, AttachVaultRequest, CancelSubscriptionRequest,
    OpenSubscriptionRequest, SubscriptionDetail, SubscriptionStatus as SdkStatus,
};
use reqwest::StatusCode;
use uuid::Uuid;

pub struct RemoteStore {
    client: CheckoutClient,
}

impl RemoteStore {
    pub fn new(client: CheckoutClient) -> Self {
        Self { client }
    }

    async fn detail(&self, subscription_id: Uuid) -> Result<Option<SubscriptionDetail>, StoreError> {
        match self.client.subscription(subscription_id).await {
            Ok(detail) => Ok(Some(detail)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(remote(e)),
        }
    }
}

fn is_not_found(err: &ClientError) -> bool {
    matches!(err, ClientError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
}

fn remote(err: impl std::fmt::Display) -> StoreError {
    StoreError::Remote(err.to_string())
}

#[async_trait]
impl CheckoutStore for RemoteStore {
    async fn plan(&self, plan_id: i64) -> Result<Option<Plan>, StoreError> {
        match self.client.plan(plan_id).await {
            Ok(response) => Plan::try_from(response.plan).map(Some).map_err(remote),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(remote(e)),
        }
    }

    async fn insert_subscription(
        &self,
        subscription: InsertSubscription,
    ) -> Result<Subscription, StoreError> {
        let request = OpenSubscriptionRequest {
            subscriber_address: subscription.subscriber_address,
            activation_mode: subscription.activation_mode.into(),
        };
        let response = self
            .client
            .open_subscription(subscription.plan_id, &request)
            .await
            .map_err(remote)?;
        Subscription::try_from(response).map_err(remote)
    }

    async fn insert_vault(&self, vault: InsertDepositVault) -> Result<DepositVault, StoreError> {
        let request = AttachVaultRequest {
            vault_address: vault.vault_address,
        };
        let response = self
            .client
            .attach_vault(vault.subscription_id, &request)
            .await
            .map_err(remote)?;
        DepositVault::try_from(response).map_err(remote)
    }

    async fn subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        self.detail(subscription_id)
            .await?
            .map(|detail| Subscription::try_from(detail.subscription).map_err(remote))
            .transpose()
    }

    async fn vault_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<DepositVault>, StoreError> {
        self.detail(subscription_id)
            .await?
            .and_then(|detail| detail.vault)
            .map(|vault| DepositVault::try_from(vault).map_err(remote))
            .transpose()
    }

    /// Looked up through the subscriber's portal listing.
    async fn active_wallet_subscription(
        &self,
        plan_id: i64,
        subscriber_address: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        let listed = self
            .client
            .portal_subscriptions(subscriber_address)
            .await
            .map_err(remote)?;
        listed
            .into_iter()
            .map(|row| row.subscription)
            .find(|sub| {
                sub.plan_id == plan_id
                    && sub.status == SdkStatus::Active
                    && sub.activation_mode == SdkMode::Wallet
            })
            .map(|sub| Subscription::try_from(sub).map_err(remote))
            .transpose()
    }

    /// The portal endpoint needs the subscriber address, so the
    /// subscription is read first.
    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        let Some(detail) = self.detail(subscription_id).await? else {
            return Ok(None);
        };
        let request = CancelSubscriptionRequest {
            subscriber_address: detail.subscription.subscriber_address,
        };
        let response = self
            .client
            .cancel_subscription(subscription_id, &request)
            .await
            .map_err(remote)?;
        Subscription::try_from(response).map(Some).map_err(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payrail_core::entities::{ActivationMode, SubscriptionStatus};
    use payrail_sdk::objects::{BillingInterval, PortalSubscription, SubscriptionResponse};
    use url::Url;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SUBSCRIBER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn subscription(id: Uuid, status: SdkStatus) -> SubscriptionResponse {
        SubscriptionResponse {
            id,
            plan_id: 7,
            subscriber_address: SUBSCRIBER.into(),
            status,
            activation_mode: SdkMode::Vault,
            next_billing_at: None,
            created_at: 1_735_776_000,
            cancelled_at: (status == SdkStatus::Cancelled).then_some(1_735_862_400),
        }
    }

    fn store(server: &MockServer) -> RemoteStore {
        RemoteStore::new(CheckoutClient::new(Url::parse(&server.uri()).unwrap()))
    }

    #[tokio::test]
    async fn test_missing_plan_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/checkout/plans/404"))
            .respond_with(ResponseTemplate::new(404).set_body_string("plan 404 not found"))
            .mount(&server)
            .await;

        assert!(store(&server).plan(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_server_errors_are_remote_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/checkout/plans/7/subscriptions"))
            .respond_with(ResponseTemplate::new(409).set_body_string("not active on-chain"))
            .mount(&server)
            .await;

        let err = store(&server)
            .insert_subscription(InsertSubscription {
                plan_id: 7,
                subscriber_address: SUBSCRIBER.into(),
                status: SubscriptionStatus::Active,
                activation_mode: ActivationMode::Wallet,
                next_billing_at: None,
            })
            .await
            .unwrap_err();
        match err {
            StoreError::Remote(message) => assert!(message.contains("not active on-chain")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_sends_the_recorded_subscriber() {
        let server = MockServer::start().await;
        let id = Uuid::now_v7();
        let detail = SubscriptionDetail {
            subscription: subscription(id, SdkStatus::Pending),
            vault: None,
        };
        Mock::given(method("GET"))
            .and(path(format!("/api/v1/checkout/subscriptions/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(&detail))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/api/v1/portal/subscriptions/{id}/cancel")))
            .and(body_json(serde_json::json!({ "subscriber_address": SUBSCRIBER })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(subscription(id, SdkStatus::Cancelled)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cancelled = store(&server)
            .cancel_subscription(id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
    }

    fn portal_row(subscription: SubscriptionResponse) -> PortalSubscription {
        PortalSubscription {
            subscription,
            plan_name: "Pro".into(),
            plan_price: "9.99".parse().unwrap(),
            interval: BillingInterval::Monthly,
            token_symbol: "USDC".into(),
            merchant_name: "Acme".into(),
            vault: None,
        }
    }

    #[tokio::test]
    async fn test_active_wallet_subscription_from_portal_listing() {
        let server = MockServer::start().await;
        let vault_id = Uuid::now_v7();
        let wallet_id = Uuid::now_v7();
        let mut wallet = subscription(wallet_id, SdkStatus::Active);
        wallet.activation_mode = SdkMode::Wallet;
        let rows = vec![
            portal_row(subscription(vault_id, SdkStatus::Active)),
            portal_row(wallet),
        ];
        Mock::given(method("GET"))
            .and(path("/api/v1/portal/subscriptions"))
            .and(query_param("subscriber", SUBSCRIBER))
            .respond_with(ResponseTemplate::new(200).set_body_json(&rows))
            .mount(&server)
            .await;

        let store = store(&server);
        let found = store
            .active_wallet_subscription(7, SUBSCRIBER)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, wallet_id);
        assert!(
            store
                .active_wallet_subscription(8, SUBSCRIBER)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_cancel_unknown_subscription_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(
            store(&server)
                .cancel_subscription(Uuid::now_v7())
                .await
                .unwrap()
                .is_none()
        );
    }
}
