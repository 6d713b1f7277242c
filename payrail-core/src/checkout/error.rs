use alloy_primitives::{Address, TxHash};
use uuid::Uuid;

use super::store::StoreError;
use crate::web3::amounts::AmountError;
use crate::web3::{GatewayError, WalletError};

/// Everything that can stop a checkout.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("no wallet found")]
    NoWalletFound,

    #[error("wallet connection rejected by user")]
    UserRejected,

    #[error("transaction rejected by signer")]
    TransactionRejected,

    #[error("transaction reverted{}", .tx_hash.map(|h| format!(" ({h})")).unwrap_or_default())]
    TransactionReverted { tx_hash: Option<TxHash> },

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("persistence error: {0}")]
    PersistenceError(#[from] StoreError),

    /// The subscription was written but its vault was not. Retry with
    /// `resume_vault(subscription_id)`.
    #[error("subscription {subscription_id} was created but its vault was not recorded: {source}")]
    VaultNotRecorded {
        subscription_id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("plan {0} is not active")]
    PlanInactive(i64),

    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("no signer is connected")]
    SignerUnavailable,

    #[error("subscription {0} does not use a deposit vault")]
    NotVaultSubscription(Uuid),

    #[error("subscription {0} is not pending")]
    SubscriptionNotPending(Uuid),

    #[error("vault address {claimed} does not match the derived address {expected}")]
    VaultAddressMismatch { expected: Address, claimed: Address },

    #[error("subscription is not active on-chain")]
    SubscriptionNotActiveOnChain,

    #[error("subscriber already has active subscription {0} to this plan")]
    AlreadySubscribed(Uuid),

    #[error("subscription {0} belongs to another subscriber")]
    SubscriberMismatch(Uuid),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("plan id {0} cannot be used on-chain")]
    InvalidPlanId(i64),
}

impl CheckoutError {
    pub(crate) fn plan_not_found(plan_id: i64) -> Self {
        CheckoutError::NotFound(format!("plan {plan_id}"))
    }

    pub(crate) fn subscription_not_found(subscription_id: Uuid) -> Self {
        CheckoutError::NotFound(format!("subscription {subscription_id}"))
    }

    /// Whether the failure came from the wallet or the chain rather than
    /// from the request or the store.
    pub fn is_chain_failure(&self) -> bool {
        matches!(
            self,
            CheckoutError::TransactionRejected
                | CheckoutError::TransactionReverted { .. }
                | CheckoutError::NetworkError(_)
                | CheckoutError::SignerUnavailable
        )
    }
}

impl From<WalletError> for CheckoutError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::NoWalletFound => CheckoutError::NoWalletFound,
            WalletError::UserRejected => CheckoutError::UserRejected,
            WalletError::Network(message) => CheckoutError::NetworkError(message),
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::TransactionRejected => CheckoutError::TransactionRejected,
            GatewayError::TransactionReverted { tx_hash } => {
                CheckoutError::TransactionReverted { tx_hash }
            }
            GatewayError::Network(message) => CheckoutError::NetworkError(message),
            GatewayError::SignerUnavailable => CheckoutError::SignerUnavailable,
        }
    }
}

/// Parse an address read from the store or a request.
pub(crate) fn parse_address(raw: &str) -> Result<Address, CheckoutError> {
    raw.parse()
        .map_err(|_| CheckoutError::InvalidAddress(raw.to_string()))
}
