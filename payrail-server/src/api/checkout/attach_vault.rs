use alloy_primitives::Address;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use payrail_core::checkout;
use payrail_core::events::VaultCreated;
use payrail_core::web3::WalletConnector;
use payrail_sdk::objects::{AttachVaultRequest, DepositVaultResponse};
use uuid::Uuid;

use super::CheckoutApiError;
use crate::state::AppState;

/// `POST /subscriptions/{subscription_id}/vault`: record the vault of a
/// pending vault-mode subscription.
///
/// The claimed address must match the one the engine derives. Repeating the
/// call returns the vault already recorded.
pub(super) async fn attach_vault(
    state: State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<AttachVaultRequest>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let raw = payload.vault_address.trim();
    let claimed: Address = raw
        .parse()
        .map_err(|_| CheckoutApiError::invalid_address(raw))?;

    let connector = state.declared_wallet(None).await;
    let vault = checkout::attach_vault(
        &state.processor(),
        connector.read_only(),
        subscription_id,
        claimed,
    )
    .await?;

    state
        .notify_vault_created(VaultCreated {
            subscription_id,
            vault_id: vault.id,
            created_at: vault.created_at,
        })
        .await;

    Ok((StatusCode::CREATED, Json(DepositVaultResponse::from(&vault))))
}
