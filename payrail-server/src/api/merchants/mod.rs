//! Merchant API handlers.
//!
//! Every route requires a merchant session token
//! (`Authorization: Bearer …`), resolved by the
//! [`MerchantSession`](crate::api::extractors::MerchantSession) extractor.
//!
//! # Endpoints
//!
//! - `GET  /me`                         – merchant profile
//! - `GET  /me/stats`                   – dashboard counters
//! - `GET  /me/plans`                   – list plans
//! - `POST /me/plans`                   – create a plan
//! - `POST /me/plans/{id}/deactivate`   – stop accepting new subscriptions
//! - `GET  /me/subscriptions`           – subscriptions across all plans

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::state::AppState;

mod me;
mod plans;
mod stats;
mod subscriptions;

/// Build the Merchant API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(me::get_me))
        .route("/me/stats", get(stats::get_stats))
        .route("/me/plans", get(plans::list_plans).post(plans::create_plan))
        .route("/me/plans/{plan_id}/deactivate", post(plans::deactivate_plan))
        .route("/me/subscriptions", get(subscriptions::list_subscriptions))
}

/// Errors that can occur in Merchant API handlers.
#[derive(Debug)]
enum MerchantApiError {
    /// A database query failed.
    Database(sqlx::Error),
    /// The plan does not exist or belongs to another merchant.
    PlanNotFound,
    /// The request failed validation.
    Invalid(&'static str),
}

impl From<sqlx::Error> for MerchantApiError {
    fn from(e: sqlx::Error) -> Self {
        MerchantApiError::Database(e)
    }
}

impl IntoResponse for MerchantApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            MerchantApiError::Database(e) => {
                tracing::error!(error = %e, "Merchant API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            MerchantApiError::PlanNotFound => {
                (StatusCode::NOT_FOUND, "plan not found").into_response()
            }
            MerchantApiError::Invalid(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
        }
    }
}
