//! Service API handlers.
//!
//! Server-to-server routes authenticated with the merchant API key
//! (`X-Payrail-Secret`), see
//! [`ApiKeyMerchant`](crate::api::extractors::ApiKeyMerchant).
//!
//! # Endpoints
//!
//! - `GET /vaults/predict?user_wallet=0x…&plan_id=…` – deposit vault address

use alloy_primitives::Address;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use kanau::processor::Processor;
use payrail_core::entities::plans::GetPlanById;
use payrail_core::web3::{ContractGateway, GatewayError, WalletConnector, plan_id_to_u256};
use payrail_sdk::objects::{PredictVaultQuery, PredictVaultResponse};

use crate::api::extractors::ApiKeyMerchant;
use crate::state::AppState;

/// Build the Service API router.
pub fn router() -> Router<AppState> {
    Router::new().route("/vaults/predict", get(predict_vault))
}

#[derive(Debug)]
enum ServiceApiError {
    Database(sqlx::Error),
    Chain(GatewayError),
    InvalidWallet,
    PlanNotFound,
}

impl IntoResponse for ServiceApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServiceApiError::Database(e) => {
                tracing::error!(error = %e, "Service API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            ServiceApiError::Chain(e) => {
                tracing::warn!(error = %e, "Vault derivation failed");
                (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
            }
            ServiceApiError::InvalidWallet => {
                (StatusCode::BAD_REQUEST, "invalid user_wallet").into_response()
            }
            ServiceApiError::PlanNotFound => {
                (StatusCode::NOT_FOUND, "plan not found").into_response()
            }
        }
    }
}

/// `GET /vaults/predict`: where `user_wallet` would deposit for `plan_id`.
///
/// A pure read: nothing is recorded. Only the merchant's own plans can be
/// queried.
async fn predict_vault(
    state: State<AppState>,
    ApiKeyMerchant(merchant): ApiKeyMerchant,
    Query(query): Query<PredictVaultQuery>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let user_wallet: Address = query
        .user_wallet
        .trim()
        .parse()
        .map_err(|_| ServiceApiError::InvalidWallet)?;

    let plan = state
        .processor()
        .process(GetPlanById {
            plan_id: query.plan_id,
        })
        .await
        .map_err(ServiceApiError::Database)?
        .filter(|plan| plan.merchant_id == merchant.id)
        .ok_or(ServiceApiError::PlanNotFound)?;
    let plan_id = plan_id_to_u256(plan.id).ok_or(ServiceApiError::PlanNotFound)?;

    let connector = state.declared_wallet(None).await;
    let vault_address = connector
        .read_only()
        .deposit_address(user_wallet, plan_id)
        .await
        .map_err(ServiceApiError::Chain)?;

    Ok(Json(PredictVaultResponse {
        vault_address: vault_address.to_checksum(None),
    }))
}
