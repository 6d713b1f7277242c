//! Plan types.
//!
//! A plan is a merchant-defined recurring price. Its `id` doubles as the
//! on-chain plan identifier passed to the subscription engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing cadence of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Weekly,
    Monthly,
    Yearly,
}

impl BillingInterval {
    /// Length of one billing period in days (7 / 30 / 365).
    pub const fn days(self) -> i64 {
        match self {
            BillingInterval::Weekly => 7,
            BillingInterval::Monthly => 30,
            BillingInterval::Yearly => 365,
        }
    }

    pub fn duration(self) -> time::Duration {
        time::Duration::days(self.days())
    }

    /// The next billing instant when a period starts at `start`.
    pub fn next_billing_from(self, start: time::OffsetDateTime) -> time::OffsetDateTime {
        start + self.duration()
    }
}

impl std::fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BillingInterval::Weekly => "weekly",
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub id: i64,
    pub merchant_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub interval: BillingInterval,
    pub token_address: String,
    pub token_symbol: String,
    pub chain_id: i64,
    pub active: bool,
    pub created_at: i64,
}

/// A plan as shown on the public subscribe page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPlanResponse {
    #[serde(flatten)]
    pub plan: PlanResponse,
    pub merchant_name: String,
}

/// Body of `POST /api/v1/merchants/me/plans`.
///
/// `chain_id` falls back to the server's configured chain when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    pub price: Decimal,
    pub interval: BillingInterval,
    pub token_address: String,
    pub token_symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<i64>,
}
