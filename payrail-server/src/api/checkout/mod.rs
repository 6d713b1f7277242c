//! Checkout API handlers.
//!
//! Public routes used by the hosted checkout page and the portal CLI. Each
//! request builds its own [`Checkout`](payrail_core::checkout::Checkout) or
//! calls a service-boundary operation, bound to the current chain
//! configuration.
//!
//! # Endpoints
//!
//! - `GET  /plans/{plan_id}`                – plan with merchant name
//! - `POST /plans/{plan_id}/vault`          – vault checkout, run server-side
//! - `POST /plans/{plan_id}/subscriptions`  – record a subscription
//! - `POST /subscriptions/{id}/vault`       – record the vault of a pending subscription
//! - `GET  /subscriptions/{id}`             – subscription and its vault

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use payrail_core::checkout::{CheckoutError, StoreError};

use crate::state::AppState;

mod attach_vault;
mod get_plan;
mod get_subscription;
mod open_subscription;
mod vault_checkout;

/// Build the Checkout API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans/{plan_id}", get(get_plan::get_plan))
        .route("/plans/{plan_id}/vault", post(vault_checkout::vault_checkout))
        .route(
            "/plans/{plan_id}/subscriptions",
            post(open_subscription::open_subscription),
        )
        .route(
            "/subscriptions/{subscription_id}",
            get(get_subscription::get_subscription),
        )
        .route(
            "/subscriptions/{subscription_id}/vault",
            post(attach_vault::attach_vault),
        )
}

/// A checkout failure as an HTTP response. Shared with the portal API.
#[derive(Debug)]
pub(crate) struct CheckoutApiError(pub CheckoutError);

impl From<CheckoutError> for CheckoutApiError {
    fn from(err: CheckoutError) -> Self {
        CheckoutApiError(err)
    }
}

impl From<sqlx::Error> for CheckoutApiError {
    fn from(err: sqlx::Error) -> Self {
        CheckoutApiError(CheckoutError::PersistenceError(StoreError::Database(err)))
    }
}

impl CheckoutApiError {
    pub(crate) fn invalid_address(raw: &str) -> Self {
        CheckoutApiError(CheckoutError::InvalidAddress(raw.to_string()))
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
            CheckoutError::PlanInactive(_)
            | CheckoutError::NotVaultSubscription(_)
            | CheckoutError::SubscriptionNotPending(_)
            | CheckoutError::VaultAddressMismatch { .. }
            | CheckoutError::SubscriptionNotActiveOnChain
            | CheckoutError::AlreadySubscribed(_) => StatusCode::CONFLICT,
            CheckoutError::SubscriberMismatch(_) => StatusCode::FORBIDDEN,
            CheckoutError::InvalidAddress(_)
            | CheckoutError::InvalidPlanId(_)
            | CheckoutError::InvalidAmount(_)
            | CheckoutError::NoWalletFound
            | CheckoutError::UserRejected => StatusCode::BAD_REQUEST,
            CheckoutError::PersistenceError(_) | CheckoutError::VaultNotRecorded { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            err if err.is_chain_failure() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CheckoutApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match &self.0 {
            CheckoutError::PersistenceError(e) => {
                tracing::error!(error = %e, "Checkout API persistence error");
                (status, "internal server error").into_response()
            }
            // The subscription exists; the client can still attach the vault.
            CheckoutError::VaultNotRecorded { subscription_id, .. } => {
                tracing::error!(error = %self.0, "Vault was not recorded");
                (
                    status,
                    format!("vault not recorded for subscription {subscription_id}"),
                )
                    .into_response()
            }
            err if status == StatusCode::BAD_GATEWAY => {
                tracing::warn!(error = %err, "Checkout chain call failed");
                (status, err.to_string()).into_response()
            }
            err => (status, err.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use uuid::Uuid;

    fn status_of(err: CheckoutError) -> StatusCode {
        CheckoutApiError(err).into_response().status()
    }

    #[test]
    fn test_checkout_error_status_mapping() {
        assert_eq!(
            status_of(CheckoutError::NotFound("plan 1".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(CheckoutError::PlanInactive(1)), StatusCode::CONFLICT);
        assert_eq!(
            status_of(CheckoutError::VaultAddressMismatch {
                expected: Address::repeat_byte(1),
                claimed: Address::repeat_byte(2),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CheckoutError::AlreadySubscribed(Uuid::nil())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CheckoutError::SubscriberMismatch(Uuid::nil())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(CheckoutError::InvalidAddress("0xzz".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CheckoutError::NetworkError("timeout".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(CheckoutError::TransactionReverted { tx_hash: None }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(CheckoutError::PersistenceError(StoreError::Remote(
                "down".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
