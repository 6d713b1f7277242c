//! Subscription and deposit vault types.
//!
//! These are produced by the checkout flow and read back by the subscriber
//! portal and the merchant dashboard.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plans::BillingInterval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
}

/// How a subscription gets paid.
///
/// `Wallet` means the subscription engine pulls from the subscriber's
/// wallet under an ERC-20 allowance. `Vault` means the subscriber funds a
/// derived deposit address which is swept later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    Wallet,
    Vault,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VaultStatus {
    Pending,
    Funded,
    Swept,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl std::fmt::Display for ActivationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivationMode::Wallet => f.write_str("wallet"),
            ActivationMode::Vault => f.write_str("vault"),
        }
    }
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VaultStatus::Pending => "PENDING",
            VaultStatus::Funded => "FUNDED",
            VaultStatus::Swept => "SWEPT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub plan_id: i64,
    pub subscriber_address: String,
    pub status: SubscriptionStatus,
    pub activation_mode: ActivationMode,
    pub next_billing_at: Option<i64>,
    pub created_at: i64,
    pub cancelled_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositVaultResponse {
    pub id: i64,
    pub subscription_id: Uuid,
    pub vault_address: String,
    pub subscriber_address: String,
    pub plan_id: i64,
    pub merchant_id: Uuid,
    pub status: VaultStatus,
    pub created_at: i64,
    pub last_sweep_at: Option<i64>,
}

/// A subscription together with its vault, if it has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDetail {
    pub subscription: SubscriptionResponse,
    pub vault: Option<DepositVaultResponse>,
}

/// Body of `POST /api/v1/checkout/plans/{plan_id}/subscriptions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSubscriptionRequest {
    pub subscriber_address: String,
    pub activation_mode: ActivationMode,
}

/// Body of `POST /api/v1/checkout/subscriptions/{id}/vault`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachVaultRequest {
    pub vault_address: String,
}

/// Body of `POST /api/v1/checkout/plans/{plan_id}/vault`.
///
/// Without an address the server derives the vault for a fresh placeholder
/// subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCheckoutRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCheckoutResponse {
    pub subscription: SubscriptionResponse,
    pub vault: DepositVaultResponse,
}

/// Body of `POST /api/v1/portal/subscriptions/{id}/cancel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub subscriber_address: String,
}

/// A row of the subscriber portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSubscription {
    pub subscription: SubscriptionResponse,
    pub plan_name: String,
    pub plan_price: Decimal,
    pub interval: BillingInterval,
    pub token_symbol: String,
    pub merchant_name: String,
    pub vault: Option<DepositVaultResponse>,
}

/// A row of the merchant's subscription list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantSubscription {
    #[serde(flatten)]
    pub subscription: SubscriptionResponse,
    pub plan_name: String,
    pub plan_price: Decimal,
}
