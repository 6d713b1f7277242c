use crate::entities::{ActivationMode, SubscriptionStatus, VaultStatus};
use crate::framework::DatabaseProcessor;
use crate::utils::unix_timestamp;
use kanau::processor::Processor;
use payrail_sdk::objects::{DashboardStats, MerchantResponse};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MerchantUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Merchant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub treasury_address: String,
    pub api_key_hash: String,
    pub webhook_secret: String,
    pub total_revenue: Decimal,
    pub created_at: time::PrimitiveDateTime,
}

impl From<&Merchant> for MerchantResponse {
    fn from(merchant: &Merchant) -> Self {
        MerchantResponse {
            id: merchant.id,
            name: merchant.name.clone(),
            treasury_address: merchant.treasury_address.clone(),
            total_revenue: merchant.total_revenue,
            created_at: unix_timestamp(merchant.created_at),
        }
    }
}

const MERCHANT_COLUMNS: &str = "id, user_id, name, treasury_address, api_key_hash, \
    webhook_secret, total_revenue, created_at";

#[derive(Debug, Clone)]
/// Create a login and its merchant profile in one transaction.
///
/// The caller hashes the password and the API key; plaintext secrets never
/// reach the database.
pub struct InsertMerchantAccount {
    pub email: String,
    pub password_hash: String,
    pub business_name: String,
    pub treasury_address: String,
    pub api_key_hash: String,
    pub webhook_secret: String,
}

impl Processor<InsertMerchantAccount> for DatabaseProcessor {
    type Output = (MerchantUser, Merchant);
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertMerchantAccount")]
    async fn process(
        &self,
        cmd: InsertMerchantAccount,
    ) -> Result<(MerchantUser, Merchant), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, MerchantUser>(
            r#"
            INSERT INTO merchant_users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&cmd.email)
        .bind(&cmd.password_hash)
        .fetch_one(&mut *tx)
        .await?;

        let merchant = sqlx::query_as::<_, Merchant>(&format!(
            r#"
            INSERT INTO merchants (id, user_id, name, treasury_address, api_key_hash, webhook_secret)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MERCHANT_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(user.id)
        .bind(&cmd.business_name)
        .bind(&cmd.treasury_address)
        .bind(&cmd.api_key_hash)
        .bind(&cmd.webhook_secret)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((user, merchant))
    }
}

#[derive(Debug, Clone)]
pub struct GetUserByEmail {
    pub email: String,
}

impl Processor<GetUserByEmail> for DatabaseProcessor {
    type Output = Option<MerchantUser>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserByEmail")]
    async fn process(&self, query: GetUserByEmail) -> Result<Option<MerchantUser>, sqlx::Error> {
        sqlx::query_as::<_, MerchantUser>(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM merchant_users
            WHERE email = $1
            "#,
        )
        .bind(query.email)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetMerchantByUserId {
    pub user_id: Uuid,
}

impl Processor<GetMerchantByUserId> for DatabaseProcessor {
    type Output = Option<Merchant>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetMerchantByUserId")]
    async fn process(&self, query: GetMerchantByUserId) -> Result<Option<Merchant>, sqlx::Error> {
        sqlx::query_as::<_, Merchant>(&format!(
            "SELECT {MERCHANT_COLUMNS} FROM merchants WHERE user_id = $1"
        ))
        .bind(query.user_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Look up the merchant owning an API key by the key's SHA-256 digest.
pub struct GetMerchantByApiKeyHash {
    pub api_key_hash: String,
}

impl Processor<GetMerchantByApiKeyHash> for DatabaseProcessor {
    type Output = Option<Merchant>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetMerchantByApiKeyHash")]
    async fn process(
        &self,
        query: GetMerchantByApiKeyHash,
    ) -> Result<Option<Merchant>, sqlx::Error> {
        sqlx::query_as::<_, Merchant>(&format!(
            "SELECT {MERCHANT_COLUMNS} FROM merchants WHERE api_key_hash = $1"
        ))
        .bind(query.api_key_hash)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantStats {
    pub total_revenue: Decimal,
    pub wallet_active: i64,
    pub vault_active: i64,
    pub pending_vaults: i64,
}

impl From<MerchantStats> for DashboardStats {
    fn from(stats: MerchantStats) -> Self {
        DashboardStats {
            total_revenue: stats.total_revenue,
            active_subscriptions: stats.wallet_active + stats.vault_active,
            wallet_subscriptions: stats.wallet_active,
            vault_subscriptions: stats.vault_active,
            pending_vaults: stats.pending_vaults,
        }
    }
}

#[derive(Debug, Clone)]
/// Dashboard counters: active subscriptions per activation mode, vaults
/// still waiting for funds, and collected revenue.
pub struct GetMerchantStats {
    pub merchant_id: Uuid,
}

impl Processor<GetMerchantStats> for DatabaseProcessor {
    type Output = MerchantStats;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetMerchantStats")]
    async fn process(&self, query: GetMerchantStats) -> Result<MerchantStats, sqlx::Error> {
        let (total_revenue, wallet_active, vault_active, pending_vaults) =
            sqlx::query_as::<_, (Decimal, i64, i64, i64)>(
                r#"
                SELECT
                    m.total_revenue,
                    (SELECT COUNT(*) FROM subscriptions s JOIN plans p ON p.id = s.plan_id
                      WHERE p.merchant_id = m.id AND s.status = $2 AND s.activation_mode = $3),
                    (SELECT COUNT(*) FROM subscriptions s JOIN plans p ON p.id = s.plan_id
                      WHERE p.merchant_id = m.id AND s.status = $2 AND s.activation_mode = $4),
                    (SELECT COUNT(*) FROM deposit_vaults v
                      WHERE v.merchant_id = m.id AND v.status = $5)
                FROM merchants m
                WHERE m.id = $1
                "#,
            )
            .bind(query.merchant_id)
            .bind(SubscriptionStatus::Active)
            .bind(ActivationMode::Wallet)
            .bind(ActivationMode::Vault)
            .bind(VaultStatus::Pending)
            .fetch_one(&self.pool)
            .await?;

        Ok(MerchantStats {
            total_revenue,
            wallet_active,
            vault_active,
            pending_vaults,
        })
    }
}
