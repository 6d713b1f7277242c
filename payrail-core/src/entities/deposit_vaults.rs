use crate::entities::{BillingInterval, SubscriptionStatus, VaultStatus};
use crate::framework::DatabaseProcessor;
use crate::utils::unix_timestamp;
use kanau::processor::Processor;
use payrail_sdk::objects::DepositVaultResponse;
use rust_decimal::Decimal;
use uuid::Uuid;

/// The derived deposit address a vault-mode subscriber funds.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DepositVault {
    pub id: i64,
    pub subscription_id: Uuid,
    pub vault_address: String,
    pub subscriber_address: String,
    pub plan_id: i64,
    pub merchant_id: Uuid,
    pub status: VaultStatus,
    pub created_at: time::PrimitiveDateTime,
    pub last_sweep_at: Option<time::PrimitiveDateTime>,
}

impl From<&DepositVault> for DepositVaultResponse {
    fn from(vault: &DepositVault) -> Self {
        DepositVaultResponse {
            id: vault.id,
            subscription_id: vault.subscription_id,
            vault_address: vault.vault_address.clone(),
            subscriber_address: vault.subscriber_address.clone(),
            plan_id: vault.plan_id,
            merchant_id: vault.merchant_id,
            status: vault.status.into(),
            created_at: unix_timestamp(vault.created_at),
            last_sweep_at: vault.last_sweep_at.map(unix_timestamp),
        }
    }
}

impl TryFrom<DepositVaultResponse> for DepositVault {
    type Error = super::InvalidTimestamp;

    fn try_from(vault: DepositVaultResponse) -> Result<Self, Self::Error> {
        Ok(DepositVault {
            id: vault.id,
            subscription_id: vault.subscription_id,
            vault_address: vault.vault_address,
            subscriber_address: vault.subscriber_address,
            plan_id: vault.plan_id,
            merchant_id: vault.merchant_id,
            status: vault.status.into(),
            created_at: super::parse_timestamp(vault.created_at)?,
            last_sweep_at: vault.last_sweep_at.map(super::parse_timestamp).transpose()?,
        })
    }
}

const VAULT_COLUMNS: &str = "id, subscription_id, vault_address, subscriber_address, plan_id, \
    merchant_id, status, created_at, last_sweep_at";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Record the vault of a subscription with status `PENDING`.
///
/// There is at most one vault per subscription. Inserting again returns the
/// existing row unchanged, so a failed checkout step can simply be re-run.
pub struct InsertDepositVault {
    pub subscription_id: Uuid,
    pub vault_address: String,
    pub subscriber_address: String,
    pub plan_id: i64,
    pub merchant_id: Uuid,
}

impl Processor<InsertDepositVault> for DatabaseProcessor {
    type Output = DepositVault;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertDepositVault")]
    async fn process(&self, cmd: InsertDepositVault) -> Result<DepositVault, sqlx::Error> {
        sqlx::query_as::<_, DepositVault>(&format!(
            r#"
            WITH inserted AS (
                INSERT INTO deposit_vaults (subscription_id, vault_address, subscriber_address, plan_id, merchant_id, status)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (subscription_id) DO NOTHING
                RETURNING {VAULT_COLUMNS}
            )
            SELECT {VAULT_COLUMNS} FROM inserted
            UNION ALL
            SELECT {VAULT_COLUMNS} FROM deposit_vaults WHERE subscription_id = $1
            LIMIT 1
            "#
        ))
        .bind(cmd.subscription_id)
        .bind(cmd.vault_address)
        .bind(cmd.subscriber_address)
        .bind(cmd.plan_id)
        .bind(cmd.merchant_id)
        .bind(VaultStatus::Pending)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetVaultBySubscription {
    pub subscription_id: Uuid,
}

impl Processor<GetVaultBySubscription> for DatabaseProcessor {
    type Output = Option<DepositVault>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetVaultBySubscription")]
    async fn process(
        &self,
        query: GetVaultBySubscription,
    ) -> Result<Option<DepositVault>, sqlx::Error> {
        sqlx::query_as::<_, DepositVault>(&format!(
            "SELECT {VAULT_COLUMNS} FROM deposit_vaults WHERE subscription_id = $1"
        ))
        .bind(query.subscription_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ListVaultsBySubscriptions {
    pub subscription_ids: Vec<Uuid>,
}

impl Processor<ListVaultsBySubscriptions> for DatabaseProcessor {
    type Output = Vec<DepositVault>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListVaultsBySubscriptions")]
    async fn process(
        &self,
        query: ListVaultsBySubscriptions,
    ) -> Result<Vec<DepositVault>, sqlx::Error> {
        if query.subscription_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, DepositVault>(&format!(
            "SELECT {VAULT_COLUMNS} FROM deposit_vaults WHERE subscription_id = ANY($1)"
        ))
        .bind(query.subscription_ids)
        .fetch_all(&self.pool)
        .await
    }
}

/// An unswept vault with what the watcher needs to judge its balance.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UnsweptVault {
    pub id: i64,
    pub subscription_id: Uuid,
    pub vault_address: String,
    pub subscriber_address: String,
    pub plan_id: i64,
    pub merchant_id: Uuid,
    pub status: VaultStatus,
    pub token_address: String,
    pub price: Decimal,
    pub interval: BillingInterval,
}

#[derive(Debug, Clone)]
/// Vaults still waiting for funds or for their sweep, oldest first.
pub struct ListUnsweptVaults {
    pub limit: i64,
}

impl Processor<ListUnsweptVaults> for DatabaseProcessor {
    type Output = Vec<UnsweptVault>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListUnsweptVaults")]
    async fn process(&self, query: ListUnsweptVaults) -> Result<Vec<UnsweptVault>, sqlx::Error> {
        sqlx::query_as::<_, UnsweptVault>(
            r#"
            SELECT
                v.id, v.subscription_id, v.vault_address, v.subscriber_address,
                v.plan_id, v.merchant_id, v.status,
                p.token_address, p.price, p."interval"
            FROM deposit_vaults v
            JOIN plans p ON p.id = v.plan_id
            JOIN subscriptions s ON s.id = v.subscription_id
            WHERE v.status <> $1 AND s.status = $2
            ORDER BY v.created_at ASC
            LIMIT $3
            "#,
        )
        .bind(VaultStatus::Swept)
        .bind(SubscriptionStatus::Pending)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Note that a vault holds enough funds and is about to be swept.
pub struct MarkVaultFunded {
    pub vault_id: i64,
}

impl Processor<MarkVaultFunded> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkVaultFunded")]
    async fn process(&self, cmd: MarkVaultFunded) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE deposit_vaults SET status = $2 WHERE id = $1 AND status = $3")
            .bind(cmd.vault_id)
            .bind(VaultStatus::Funded)
            .bind(VaultStatus::Pending)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Settle a confirmed sweep in one transaction: the vault becomes `SWEPT`,
/// the pending subscription becomes `active` with its first billing date,
/// and the price is added to the merchant's revenue.
pub struct CompleteVaultSweep {
    pub vault_id: i64,
    pub subscription_id: Uuid,
    pub merchant_id: Uuid,
    pub price: Decimal,
    pub next_billing_at: time::PrimitiveDateTime,
}

impl Processor<CompleteVaultSweep> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CompleteVaultSweep")]
    async fn process(&self, cmd: CompleteVaultSweep) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE deposit_vaults
            SET status = $2, last_sweep_at = NOW() AT TIME ZONE 'utc'
            WHERE id = $1
            "#,
        )
        .bind(cmd.vault_id)
        .bind(VaultStatus::Swept)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2, next_billing_at = $3
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(cmd.subscription_id)
        .bind(SubscriptionStatus::Active)
        .bind(cmd.next_billing_at)
        .bind(SubscriptionStatus::Pending)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE merchants SET total_revenue = total_revenue + $2 WHERE id = $1")
            .bind(cmd.merchant_id)
            .bind(cmd.price)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
