use alloy_primitives::Address;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use payrail_core::checkout::cancel_for_subscriber;
use payrail_sdk::objects::{CancelSubscriptionRequest, SubscriptionResponse};
use uuid::Uuid;

use crate::api::checkout::CheckoutApiError;
use crate::state::AppState;

/// `POST /subscriptions/{subscription_id}/cancel`: cancel a subscription.
///
/// Nothing happens on-chain; the subscription simply stops renewing.
/// Cancelling twice returns the first cancellation unchanged.
pub(super) async fn cancel_subscription(
    state: State<AppState>,
    Path(subscription_id): Path<Uuid>,
    Json(payload): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let raw = payload.subscriber_address.trim();
    let subscriber: Address = raw
        .parse()
        .map_err(|_| CheckoutApiError::invalid_address(raw))?;

    let subscription = cancel_for_subscriber(&state.processor(), subscription_id, subscriber).await?;
    tracing::info!(%subscription_id, %subscriber, "Subscription cancelled");

    Ok(Json(SubscriptionResponse::from(&subscription)))
}
