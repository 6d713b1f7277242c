use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use payrail_core::checkout::CheckoutError;
use payrail_core::entities::deposit_vaults::GetVaultBySubscription;
use payrail_core::entities::subscriptions::GetSubscriptionById;
use payrail_sdk::objects::{DepositVaultResponse, SubscriptionDetail, SubscriptionResponse};
use uuid::Uuid;

use super::CheckoutApiError;
use crate::state::AppState;

/// `GET /subscriptions/{subscription_id}`: polled while a vault checkout
/// waits for its deposit.
pub(super) async fn get_subscription(
    state: State<AppState>,
    Path(subscription_id): Path<Uuid>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let processor = state.processor();
    let subscription = processor
        .process(GetSubscriptionById { subscription_id })
        .await?
        .ok_or_else(|| CheckoutError::NotFound(format!("subscription {subscription_id}")))?;
    let vault = processor
        .process(GetVaultBySubscription { subscription_id })
        .await?;

    Ok(Json(SubscriptionDetail {
        subscription: SubscriptionResponse::from(&subscription),
        vault: vault.as_ref().map(DepositVaultResponse::from),
    }))
}
