use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use payrail_core::checkout::CheckoutError;
use payrail_core::entities::plans::GetPlanWithMerchant;
use payrail_sdk::objects::CheckoutPlanResponse;

use super::CheckoutApiError;
use crate::state::AppState;

/// `GET /plans/{plan_id}`: what the checkout page shows.
///
/// Inactive plans are returned too, flagged by `active`, so the page can
/// say the plan is no longer offered.
pub(super) async fn get_plan(
    state: State<AppState>,
    Path(plan_id): Path<i64>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let plan = state
        .processor()
        .process(GetPlanWithMerchant { plan_id })
        .await?
        .ok_or_else(|| CheckoutError::NotFound(format!("plan {plan_id}")))?;
    Ok(Json(CheckoutPlanResponse::from(&plan)))
}
