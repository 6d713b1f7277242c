//! Portal API handlers.
//!
//! Subscriber self-service. There is no login: a subscriber is identified
//! by the address they present, and cancelling requires the address the
//! subscription was opened with.
//!
//! # Endpoints
//!
//! - `GET  /subscriptions?subscriber=0x…`  – subscriptions of an address
//! - `POST /subscriptions/{id}/cancel`     – cancel one of them

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod cancel_subscription;
mod list_subscriptions;

/// Build the Portal API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/subscriptions",
            get(list_subscriptions::list_subscriptions),
        )
        .route(
            "/subscriptions/{subscription_id}/cancel",
            post(cancel_subscription::cancel_subscription),
        )
}
