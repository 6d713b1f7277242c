use axum::{Json, extract::State, response::IntoResponse};
use kanau::processor::Processor;
use payrail_core::entities::subscriptions::ListMerchantSubscriptions;
use payrail_sdk::objects::MerchantSubscription;

use super::MerchantApiError;
use crate::api::extractors::MerchantSession;
use crate::state::AppState;

/// `GET /me/subscriptions`: every subscription to any of the merchant's
/// plans, newest first.
pub(super) async fn list_subscriptions(
    state: State<AppState>,
    MerchantSession(merchant): MerchantSession,
) -> Result<impl IntoResponse, MerchantApiError> {
    let rows = state
        .processor()
        .process(ListMerchantSubscriptions {
            merchant_id: merchant.id,
        })
        .await?;
    Ok(Json(
        rows.iter()
            .map(MerchantSubscription::from)
            .collect::<Vec<_>>(),
    ))
}
