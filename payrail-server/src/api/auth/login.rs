use axum::{Json, extract::State, response::IntoResponse};
use kanau::processor::Processor;
use payrail_core::entities::merchants::GetUserByEmail;
use payrail_sdk::objects::{LoginRequest, TokenResponse};
use payrail_sdk::session::{SessionClaims, TOKEN_TYPE};

use super::{AuthApiError, normalize_email, verify_password};
use crate::state::AppState;

/// `POST /login`: exchange email and password for a session token.
pub(super) async fn login(
    state: State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthApiError> {
    let user = state
        .processor()
        .process(GetUserByEmail {
            email: normalize_email(&payload.email),
        })
        .await
        .map_err(AuthApiError::Database)?
        .ok_or(AuthApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "Login with wrong password");
        return Err(AuthApiError::InvalidCredentials);
    }

    let auth = state.config.auth.read().await;
    let access_token = SessionClaims::new(user.id).sign(auth.secret_bytes());
    drop(auth);

    Ok(Json(TokenResponse {
        access_token,
        token_type: TOKEN_TYPE.to_string(),
    }))
}
