use alloy_primitives::Address;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use payrail_core::checkout::Checkout;
use payrail_core::events::VaultCreated;
use payrail_sdk::objects::{
    DepositVaultResponse, SubscriptionResponse, VaultCheckoutRequest, VaultCheckoutResponse,
};

use super::CheckoutApiError;
use crate::state::AppState;

/// `POST /plans/{plan_id}/vault`: run the deposit-vault path.
///
/// With a `subscriber_address` the vault is derived for that address;
/// without one a random placeholder subscriber is used.
pub(super) async fn vault_checkout(
    state: State<AppState>,
    Path(plan_id): Path<i64>,
    Json(payload): Json<VaultCheckoutRequest>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let subscriber = payload
        .subscriber_address
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            raw.parse::<Address>()
                .map_err(|_| CheckoutApiError::invalid_address(raw))
        })
        .transpose()?;

    let connector = state.declared_wallet(subscriber).await;
    let mut checkout = Checkout::new(state.processor(), connector, state.token_decimals().await);
    if subscriber.is_some() {
        checkout.connect_wallet().await?;
    }
    let result = checkout.generate_vault(plan_id).await?;

    state
        .notify_vault_created(VaultCreated {
            subscription_id: result.subscription.id,
            vault_id: result.vault.id,
            created_at: result.vault.created_at,
        })
        .await;

    Ok((
        StatusCode::CREATED,
        Json(VaultCheckoutResponse {
            subscription: SubscriptionResponse::from(&result.subscription),
            vault: DepositVaultResponse::from(&result.vault),
        }),
    ))
}
