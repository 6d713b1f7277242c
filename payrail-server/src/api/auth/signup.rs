use alloy_primitives::Address;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use kanau::processor::Processor;
use payrail_core::entities::merchants::{GetUserByEmail, InsertMerchantAccount};
use payrail_sdk::objects::{SignupRequest, SignupResponse};
use payrail_sdk::session::{
    SessionClaims, TOKEN_TYPE, generate_api_key, generate_webhook_secret, hash_api_key,
};

use super::{AuthApiError, hash_password, normalize_email};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

/// `POST /signup`: create a merchant login and its merchant profile.
///
/// The API key and webhook secret are returned once and never again; only
/// the key's digest is stored.
pub(super) async fn signup(
    state: State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AuthApiError> {
    let email = normalize_email(&payload.email);
    if !email.contains('@') {
        return Err(AuthApiError::Invalid("invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AuthApiError::Invalid(
            "password must be at least 8 characters",
        ));
    }
    let business_name = payload.business_name.trim();
    if business_name.is_empty() {
        return Err(AuthApiError::Invalid("business name is required"));
    }
    let treasury: Address = payload
        .treasury_address
        .trim()
        .parse()
        .map_err(|_| AuthApiError::Invalid("invalid treasury address"))?;

    let processor = state.processor();
    let existing = processor
        .process(GetUserByEmail {
            email: email.clone(),
        })
        .await
        .map_err(AuthApiError::Database)?;
    if existing.is_some() {
        return Err(AuthApiError::EmailTaken);
    }

    let api_key = generate_api_key();
    let webhook_secret = generate_webhook_secret();
    let (user, merchant) = processor
        .process(InsertMerchantAccount {
            email,
            password_hash: hash_password(&payload.password)?,
            business_name: business_name.to_string(),
            treasury_address: treasury.to_string(),
            api_key_hash: hash_api_key(&api_key),
            webhook_secret: webhook_secret.clone(),
        })
        .await
        .map_err(|e| match e {
            // Lost a race with another signup for the same email.
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthApiError::EmailTaken,
            other => AuthApiError::Database(other),
        })?;

    let auth = state.config.auth.read().await;
    let access_token = SessionClaims::new(user.id).sign(auth.secret_bytes());
    drop(auth);

    tracing::info!(merchant_id = %merchant.id, user_id = %user.id, "Merchant signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            api_key,
            webhook_secret,
        }),
    ))
}
