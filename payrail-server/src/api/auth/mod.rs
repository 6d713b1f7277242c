//! Auth API handlers.
//!
//! # Endpoints
//!
//! - `POST /signup` – create a merchant login and profile
//! - `POST /login`  – exchange credentials for a session token

use axum::{Router, http::StatusCode, response::IntoResponse, routing::post};

use crate::state::AppState;

mod login;
mod signup;

/// Build the Auth API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup::signup))
        .route("/login", post(login::login))
}

/// Errors that can occur in Auth API handlers.
#[derive(Debug)]
enum AuthApiError {
    /// A database query failed.
    Database(sqlx::Error),
    /// Password hashing failed.
    Hash(String),
    /// The email is already registered.
    EmailTaken,
    /// Unknown email or wrong password.
    InvalidCredentials,
    /// The request failed validation.
    Invalid(&'static str),
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AuthApiError::Database(e) => {
                tracing::error!(error = %e, "Auth API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AuthApiError::Hash(e) => {
                tracing::error!(error = %e, "Password hashing failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AuthApiError::EmailTaken => {
                (StatusCode::BAD_REQUEST, "email already registered").into_response()
            }
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid email or password").into_response()
            }
            AuthApiError::Invalid(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        }
    }
}

/// Hash a password with Argon2id and a random salt.
fn hash_password(password: &str) -> Result<String, AuthApiError> {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthApiError::Hash(e.to_string()))
}

/// Check a password against a stored Argon2 hash.
fn verify_password(password: &str, stored_hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    PasswordHash::new(stored_hash)
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Emails are compared case-insensitively.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
