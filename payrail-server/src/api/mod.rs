//! HTTP API, mounted under `/api/v1`.
//!
//! - [`auth`]: merchant signup and login
//! - [`merchants`]: dashboard endpoints behind a session token
//! - [`checkout`]: public subscribe flow
//! - [`portal`]: public subscriber self-service
//! - [`service`]: server-to-server endpoints behind an API key

use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod checkout;
pub mod extractors;
pub mod merchants;
pub mod portal;
pub mod service;

/// Build the `/api/v1` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/merchants", merchants::router())
        .nest("/checkout", checkout::router())
        .nest("/portal", portal::router())
        .merge(service::router())
}
