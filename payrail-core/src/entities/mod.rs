pub mod deposit_vaults;
pub mod merchants;
pub mod plans;
pub mod subscriptions;

use payrail_sdk::objects::{
    ActivationMode as SdkActivationMode, BillingInterval as SdkBillingInterval,
    SubscriptionStatus as SdkSubscriptionStatus, VaultStatus as SdkVaultStatus,
};

/// Billing interval for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `payrail_sdk::objects::BillingInterval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "billing_interval")]
pub enum BillingInterval {
    Weekly,
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn duration(self) -> time::Duration {
        SdkBillingInterval::from(self).duration()
    }
}

impl From<BillingInterval> for SdkBillingInterval {
    fn from(value: BillingInterval) -> Self {
        match value {
            BillingInterval::Weekly => SdkBillingInterval::Weekly,
            BillingInterval::Monthly => SdkBillingInterval::Monthly,
            BillingInterval::Yearly => SdkBillingInterval::Yearly,
        }
    }
}

impl From<SdkBillingInterval> for BillingInterval {
    fn from(value: SdkBillingInterval) -> Self {
        match value {
            SdkBillingInterval::Weekly => BillingInterval::Weekly,
            SdkBillingInterval::Monthly => BillingInterval::Monthly,
            SdkBillingInterval::Yearly => BillingInterval::Yearly,
        }
    }
}

/// Subscription status for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "subscription_status")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
}

impl From<SubscriptionStatus> for SdkSubscriptionStatus {
    fn from(value: SubscriptionStatus) -> Self {
        match value {
            SubscriptionStatus::Pending => SdkSubscriptionStatus::Pending,
            SubscriptionStatus::Active => SdkSubscriptionStatus::Active,
            SubscriptionStatus::Cancelled => SdkSubscriptionStatus::Cancelled,
        }
    }
}

impl From<SdkSubscriptionStatus> for SubscriptionStatus {
    fn from(value: SdkSubscriptionStatus) -> Self {
        match value {
            SdkSubscriptionStatus::Pending => SubscriptionStatus::Pending,
            SdkSubscriptionStatus::Active => SubscriptionStatus::Active,
            SdkSubscriptionStatus::Cancelled => SubscriptionStatus::Cancelled,
        }
    }
}

/// Activation mode for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "activation_mode")]
pub enum ActivationMode {
    Wallet,
    Vault,
}

impl From<ActivationMode> for SdkActivationMode {
    fn from(value: ActivationMode) -> Self {
        match value {
            ActivationMode::Wallet => SdkActivationMode::Wallet,
            ActivationMode::Vault => SdkActivationMode::Vault,
        }
    }
}

impl From<SdkActivationMode> for ActivationMode {
    fn from(value: SdkActivationMode) -> Self {
        match value {
            SdkActivationMode::Wallet => ActivationMode::Wallet,
            SdkActivationMode::Vault => ActivationMode::Vault,
        }
    }
}

/// Deposit vault status for database operations.
///
/// Only `Pending` is written by checkout; `Funded` and `Swept` belong to
/// the vault watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE", type_name = "vault_status")]
pub enum VaultStatus {
    Pending,
    Funded,
    Swept,
}

impl From<VaultStatus> for SdkVaultStatus {
    fn from(value: VaultStatus) -> Self {
        match value {
            VaultStatus::Pending => SdkVaultStatus::Pending,
            VaultStatus::Funded => SdkVaultStatus::Funded,
            VaultStatus::Swept => SdkVaultStatus::Swept,
        }
    }
}

impl From<SdkVaultStatus> for VaultStatus {
    fn from(value: SdkVaultStatus) -> Self {
        match value {
            SdkVaultStatus::Pending => VaultStatus::Pending,
            SdkVaultStatus::Funded => VaultStatus::Funded,
            SdkVaultStatus::Swept => VaultStatus::Swept,
        }
    }
}

/// A wire record carried a timestamp that cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timestamp {0} is out of range")]
pub struct InvalidTimestamp(pub i64);

pub(crate) fn parse_timestamp(seconds: i64) -> Result<time::PrimitiveDateTime, InvalidTimestamp> {
    crate::utils::from_unix_timestamp(seconds).ok_or(InvalidTimestamp(seconds))
}
