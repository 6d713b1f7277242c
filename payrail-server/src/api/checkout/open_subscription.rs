use alloy_primitives::Address;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use payrail_core::checkout;
use payrail_core::web3::WalletConnector;
use payrail_sdk::objects::{OpenSubscriptionRequest, SubscriptionResponse};

use super::CheckoutApiError;
use crate::state::AppState;

/// `POST /plans/{plan_id}/subscriptions`: record a subscription the
/// client set up itself.
///
/// Wallet mode is only accepted once the engine reports the subscription
/// active, and only once per plan and subscriber; vault mode is recorded as
/// pending and needs its vault attached.
pub(super) async fn open_subscription(
    state: State<AppState>,
    Path(plan_id): Path<i64>,
    Json(payload): Json<OpenSubscriptionRequest>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let raw = payload.subscriber_address.trim();
    let subscriber: Address = raw
        .parse()
        .map_err(|_| CheckoutApiError::invalid_address(raw))?;

    let connector = state.declared_wallet(None).await;
    let subscription = checkout::open_subscription(
        &state.processor(),
        connector.read_only(),
        plan_id,
        subscriber,
        payload.activation_mode.into(),
        state.token_decimals().await,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse::from(&subscription)),
    ))
}
