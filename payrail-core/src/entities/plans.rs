use crate::entities::BillingInterval;
use crate::framework::DatabaseProcessor;
use crate::utils::unix_timestamp;
use kanau::processor::Processor;
use payrail_sdk::objects::{CheckoutPlanResponse, PlanResponse};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A merchant's recurring price. `id` is also the on-chain plan id.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Plan {
    pub id: i64,
    pub merchant_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub interval: BillingInterval,
    pub token_address: String,
    pub token_symbol: String,
    pub chain_id: i64,
    pub active: bool,
    pub created_at: time::PrimitiveDateTime,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        PlanResponse {
            id: plan.id,
            merchant_id: plan.merchant_id,
            name: plan.name.clone(),
            price: plan.price,
            interval: plan.interval.into(),
            token_address: plan.token_address.clone(),
            token_symbol: plan.token_symbol.clone(),
            chain_id: plan.chain_id,
            active: plan.active,
            created_at: unix_timestamp(plan.created_at),
        }
    }
}

impl TryFrom<PlanResponse> for Plan {
    type Error = super::InvalidTimestamp;

    fn try_from(plan: PlanResponse) -> Result<Self, Self::Error> {
        Ok(Plan {
            id: plan.id,
            merchant_id: plan.merchant_id,
            name: plan.name,
            price: plan.price,
            interval: plan.interval.into(),
            token_address: plan.token_address,
            token_symbol: plan.token_symbol,
            chain_id: plan.chain_id,
            active: plan.active,
            created_at: super::parse_timestamp(plan.created_at)?,
        })
    }
}

/// A plan joined with the name of the merchant selling it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PlanWithMerchant {
    #[sqlx(flatten)]
    pub plan: Plan,
    pub merchant_name: String,
}

impl From<&PlanWithMerchant> for CheckoutPlanResponse {
    fn from(row: &PlanWithMerchant) -> Self {
        CheckoutPlanResponse {
            plan: PlanResponse::from(&row.plan),
            merchant_name: row.merchant_name.clone(),
        }
    }
}

const PLAN_COLUMNS: &str = r#"id, merchant_id, name, price, "interval", token_address, token_symbol, chain_id, active, created_at"#;

#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub merchant_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub interval: BillingInterval,
    pub token_address: String,
    pub token_symbol: String,
    pub chain_id: i64,
}

impl Processor<CreatePlan> for DatabaseProcessor {
    type Output = Plan;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CreatePlan")]
    async fn process(&self, cmd: CreatePlan) -> Result<Plan, sqlx::Error> {
        sqlx::query_as::<_, Plan>(&format!(
            r#"
            INSERT INTO plans (merchant_id, name, price, "interval", token_address, token_symbol, chain_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(cmd.merchant_id)
        .bind(cmd.name)
        .bind(cmd.price)
        .bind(cmd.interval)
        .bind(cmd.token_address)
        .bind(cmd.token_symbol)
        .bind(cmd.chain_id)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetPlanById {
    pub plan_id: i64,
}

impl Processor<GetPlanById> for DatabaseProcessor {
    type Output = Option<Plan>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPlanById")]
    async fn process(&self, query: GetPlanById) -> Result<Option<Plan>, sqlx::Error> {
        sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"))
            .bind(query.plan_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Load a plan for the public subscribe page, with its merchant's name.
pub struct GetPlanWithMerchant {
    pub plan_id: i64,
}

impl Processor<GetPlanWithMerchant> for DatabaseProcessor {
    type Output = Option<PlanWithMerchant>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPlanWithMerchant")]
    async fn process(
        &self,
        query: GetPlanWithMerchant,
    ) -> Result<Option<PlanWithMerchant>, sqlx::Error> {
        sqlx::query_as::<_, PlanWithMerchant>(
            r#"
            SELECT
                p.id, p.merchant_id, p.name, p.price, p."interval", p.token_address,
                p.token_symbol, p.chain_id, p.active, p.created_at,
                m.name AS merchant_name
            FROM plans p
            JOIN merchants m ON m.id = p.merchant_id
            WHERE p.id = $1
            "#,
        )
        .bind(query.plan_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct ListPlansByMerchant {
    pub merchant_id: Uuid,
}

impl Processor<ListPlansByMerchant> for DatabaseProcessor {
    type Output = Vec<Plan>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListPlansByMerchant")]
    async fn process(&self, query: ListPlansByMerchant) -> Result<Vec<Plan>, sqlx::Error> {
        sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE merchant_id = $1 ORDER BY created_at DESC"
        ))
        .bind(query.merchant_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Stop offering a plan. Existing subscriptions are untouched.
///
/// Returns `None` when the plan does not exist or belongs to another
/// merchant.
pub struct DeactivatePlan {
    pub merchant_id: Uuid,
    pub plan_id: i64,
}

impl Processor<DeactivatePlan> for DatabaseProcessor {
    type Output = Option<Plan>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeactivatePlan")]
    async fn process(&self, cmd: DeactivatePlan) -> Result<Option<Plan>, sqlx::Error> {
        sqlx::query_as::<_, Plan>(&format!(
            r#"
            UPDATE plans SET active = FALSE
            WHERE id = $1 AND merchant_id = $2
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(cmd.plan_id)
        .bind(cmd.merchant_id)
        .fetch_optional(&self.pool)
        .await
    }
}
