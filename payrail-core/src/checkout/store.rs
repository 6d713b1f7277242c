//! Persistence seam of the checkout flow.
//!
//! The server implements [`CheckoutStore`] directly on the database; the
//! portal implements it over the server's checkout API.

use async_trait::async_trait;
use kanau::processor::Processor;
use uuid::Uuid;

use crate::entities::deposit_vaults::{DepositVault, GetVaultBySubscription, InsertDepositVault};
use crate::entities::plans::{GetPlanById, Plan};
use crate::entities::subscriptions::{
    CancelSubscription, GetActiveWalletSubscription, GetSubscriptionById, InsertSubscription,
    Subscription,
};
use crate::framework::DatabaseProcessor;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A remote store refused or failed the write.
    #[error("{0}")]
    Remote(String),
}

/// Reads and writes the checkout flow needs.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn plan(&self, plan_id: i64) -> Result<Option<Plan>, StoreError>;

    async fn insert_subscription(
        &self,
        subscription: InsertSubscription,
    ) -> Result<Subscription, StoreError>;

    /// Must be idempotent per subscription: a second insert returns the
    /// vault recorded first.
    async fn insert_vault(&self, vault: InsertDepositVault) -> Result<DepositVault, StoreError>;

    async fn subscription(&self, subscription_id: Uuid)
    -> Result<Option<Subscription>, StoreError>;

    async fn vault_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<DepositVault>, StoreError>;

    /// The subscriber's active wallet-mode subscription to the plan.
    async fn active_wallet_subscription(
        &self,
        plan_id: i64,
        subscriber_address: &str,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Must be idempotent: cancelling twice keeps the first `cancelled_at`.
    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError>;
}

#[async_trait]
impl CheckoutStore for DatabaseProcessor {
    async fn plan(&self, plan_id: i64) -> Result<Option<Plan>, StoreError> {
        Ok(self.process(GetPlanById { plan_id }).await?)
    }

    async fn insert_subscription(
        &self,
        subscription: InsertSubscription,
    ) -> Result<Subscription, StoreError> {
        Ok(self.process(subscription).await?)
    }

    async fn insert_vault(&self, vault: InsertDepositVault) -> Result<DepositVault, StoreError> {
        Ok(self.process(vault).await?)
    }

    async fn subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self.process(GetSubscriptionById { subscription_id }).await?)
    }

    async fn vault_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<DepositVault>, StoreError> {
        Ok(self.process(GetVaultBySubscription { subscription_id }).await?)
    }

    async fn active_wallet_subscription(
        &self,
        plan_id: i64,
        subscriber_address: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .process(GetActiveWalletSubscription {
                plan_id,
                subscriber_address: subscriber_address.to_string(),
            })
            .await?)
    }

    async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self.process(CancelSubscription { subscription_id }).await?)
    }
}
