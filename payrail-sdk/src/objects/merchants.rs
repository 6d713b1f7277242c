use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated merchant profile.
///
/// Neither the API key nor the webhook secret is ever returned here; both
/// are shown once in the signup response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantResponse {
    pub id: Uuid,
    pub name: String,
    pub treasury_address: String,
    pub total_revenue: Decimal,
    pub created_at: i64,
}

/// Dashboard counters for a merchant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub active_subscriptions: i64,
    pub wallet_subscriptions: i64,
    pub vault_subscriptions: i64,
    pub pending_vaults: i64,
}

/// Query of `GET /api/v1/vaults/predict`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictVaultQuery {
    pub user_wallet: String,
    pub plan_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictVaultResponse {
    pub vault_address: String,
}
