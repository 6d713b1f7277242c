use crate::entities::deposit_vaults::DepositVault;
use crate::entities::{ActivationMode, BillingInterval, SubscriptionStatus};
use crate::framework::DatabaseProcessor;
use crate::utils::unix_timestamp;
use kanau::processor::Processor;
use payrail_sdk::objects::{
    DepositVaultResponse, MerchantSubscription, PortalSubscription, SubscriptionResponse,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub plan_id: i64,
    pub subscriber_address: String,
    pub status: SubscriptionStatus,
    pub activation_mode: ActivationMode,
    pub next_billing_at: Option<time::PrimitiveDateTime>,
    pub created_at: time::PrimitiveDateTime,
    pub cancelled_at: Option<time::PrimitiveDateTime>,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(sub: &Subscription) -> Self {
        SubscriptionResponse {
            id: sub.id,
            plan_id: sub.plan_id,
            subscriber_address: sub.subscriber_address.clone(),
            status: sub.status.into(),
            activation_mode: sub.activation_mode.into(),
            next_billing_at: sub.next_billing_at.map(unix_timestamp),
            created_at: unix_timestamp(sub.created_at),
            cancelled_at: sub.cancelled_at.map(unix_timestamp),
        }
    }
}

impl TryFrom<SubscriptionResponse> for Subscription {
    type Error = super::InvalidTimestamp;

    fn try_from(sub: SubscriptionResponse) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: sub.id,
            plan_id: sub.plan_id,
            subscriber_address: sub.subscriber_address,
            status: sub.status.into(),
            activation_mode: sub.activation_mode.into(),
            next_billing_at: sub.next_billing_at.map(super::parse_timestamp).transpose()?,
            created_at: super::parse_timestamp(sub.created_at)?,
            cancelled_at: sub.cancelled_at.map(super::parse_timestamp).transpose()?,
        })
    }
}

const SUBSCRIPTION_COLUMNS: &str = "id, plan_id, subscriber_address, status, activation_mode, \
    next_billing_at, created_at, cancelled_at";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Record a new subscription.
///
/// Wallet-mode subscriptions are inserted `active` with a billing date;
/// vault-mode ones start `pending` without one.
pub struct InsertSubscription {
    pub plan_id: i64,
    pub subscriber_address: String,
    pub status: SubscriptionStatus,
    pub activation_mode: ActivationMode,
    pub next_billing_at: Option<time::PrimitiveDateTime>,
}

impl Processor<InsertSubscription> for DatabaseProcessor {
    type Output = Subscription;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertSubscription")]
    async fn process(&self, cmd: InsertSubscription) -> Result<Subscription, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (id, plan_id, subscriber_address, status, activation_mode, next_billing_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(cmd.plan_id)
        .bind(cmd.subscriber_address)
        .bind(cmd.status)
        .bind(cmd.activation_mode)
        .bind(cmd.next_billing_at)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetSubscriptionById {
    pub subscription_id: Uuid,
}

impl Processor<GetSubscriptionById> for DatabaseProcessor {
    type Output = Option<Subscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetSubscriptionById")]
    async fn process(&self, query: GetSubscriptionById) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1"
        ))
        .bind(query.subscription_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// The active wallet-mode subscription of a subscriber to a plan, if any.
pub struct GetActiveWalletSubscription {
    pub plan_id: i64,
    pub subscriber_address: String,
}

impl Processor<GetActiveWalletSubscription> for DatabaseProcessor {
    type Output = Option<Subscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetActiveWalletSubscription")]
    async fn process(
        &self,
        query: GetActiveWalletSubscription,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
            WHERE plan_id = $1 AND subscriber_address = $2
              AND status = $3 AND activation_mode = $4
            LIMIT 1
            "#
        ))
        .bind(query.plan_id)
        .bind(query.subscriber_address)
        .bind(SubscriptionStatus::Active)
        .bind(ActivationMode::Wallet)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Cancel a subscription.
///
/// Idempotent: an already cancelled subscription keeps its original
/// `cancelled_at`. No on-chain allowance is revoked.
pub struct CancelSubscription {
    pub subscription_id: Uuid,
}

impl Processor<CancelSubscription> for DatabaseProcessor {
    type Output = Option<Subscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CancelSubscription")]
    async fn process(&self, cmd: CancelSubscription) -> Result<Option<Subscription>, sqlx::Error> {
        sqlx::query_as::<_, Subscription>(&format!(
            r#"
            UPDATE subscriptions
            SET status = $2,
                cancelled_at = COALESCE(cancelled_at, NOW() AT TIME ZONE 'utc')
            WHERE id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#
        ))
        .bind(cmd.subscription_id)
        .bind(SubscriptionStatus::Cancelled)
        .fetch_optional(&self.pool)
        .await
    }
}

/// A subscription as listed in the subscriber portal.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SubscriberSubscription {
    #[sqlx(flatten)]
    pub subscription: Subscription,
    pub plan_name: String,
    pub plan_price: Decimal,
    pub plan_interval: BillingInterval,
    pub token_symbol: String,
    pub merchant_name: String,
}

impl SubscriberSubscription {
    pub fn to_portal(&self, vault: Option<&DepositVault>) -> PortalSubscription {
        PortalSubscription {
            subscription: SubscriptionResponse::from(&self.subscription),
            plan_name: self.plan_name.clone(),
            plan_price: self.plan_price,
            interval: self.plan_interval.into(),
            token_symbol: self.token_symbol.clone(),
            merchant_name: self.merchant_name.clone(),
            vault: vault.map(DepositVaultResponse::from),
        }
    }
}

#[derive(Debug, Clone)]
/// All subscriptions of one subscriber address, newest first.
pub struct ListSubscriberSubscriptions {
    pub subscriber_address: String,
}

impl Processor<ListSubscriberSubscriptions> for DatabaseProcessor {
    type Output = Vec<SubscriberSubscription>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListSubscriberSubscriptions")]
    async fn process(
        &self,
        query: ListSubscriberSubscriptions,
    ) -> Result<Vec<SubscriberSubscription>, sqlx::Error> {
        sqlx::query_as::<_, SubscriberSubscription>(
            r#"
            SELECT
                s.id, s.plan_id, s.subscriber_address, s.status, s.activation_mode,
                s.next_billing_at, s.created_at, s.cancelled_at,
                p.name AS plan_name,
                p.price AS plan_price,
                p."interval" AS plan_interval,
                p.token_symbol,
                m.name AS merchant_name
            FROM subscriptions s
            JOIN plans p ON p.id = s.plan_id
            JOIN merchants m ON m.id = p.merchant_id
            WHERE s.subscriber_address = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(query.subscriber_address)
        .fetch_all(&self.pool)
        .await
    }
}

/// A subscription as listed on the merchant dashboard.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MerchantSubscriptionRow {
    #[sqlx(flatten)]
    pub subscription: Subscription,
    pub plan_name: String,
    pub plan_price: Decimal,
}

impl From<&MerchantSubscriptionRow> for MerchantSubscription {
    fn from(row: &MerchantSubscriptionRow) -> Self {
        MerchantSubscription {
            subscription: SubscriptionResponse::from(&row.subscription),
            plan_name: row.plan_name.clone(),
            plan_price: row.plan_price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListMerchantSubscriptions {
    pub merchant_id: Uuid,
}

impl Processor<ListMerchantSubscriptions> for DatabaseProcessor {
    type Output = Vec<MerchantSubscriptionRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListMerchantSubscriptions")]
    async fn process(
        &self,
        query: ListMerchantSubscriptions,
    ) -> Result<Vec<MerchantSubscriptionRow>, sqlx::Error> {
        sqlx::query_as::<_, MerchantSubscriptionRow>(
            r#"
            SELECT
                s.id, s.plan_id, s.subscriber_address, s.status, s.activation_mode,
                s.next_billing_at, s.created_at, s.cancelled_at,
                p.name AS plan_name,
                p.price AS plan_price
            FROM subscriptions s
            JOIN plans p ON p.id = s.plan_id
            WHERE p.merchant_id = $1
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(query.merchant_id)
        .fetch_all(&self.pool)
        .await
    }
}
