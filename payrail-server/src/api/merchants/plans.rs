use alloy_primitives::Address;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use kanau::processor::Processor;
use payrail_core::entities::plans::{CreatePlan, DeactivatePlan, ListPlansByMerchant};
use payrail_core::web3::amounts::{AmountError, to_token_units};
use payrail_sdk::objects::{CreatePlanRequest, PlanResponse};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::MerchantApiError;
use crate::api::extractors::MerchantSession;
use crate::state::AppState;

const MAX_SYMBOL_LEN: usize = 16;

/// `GET /me/plans`: all plans of the merchant, active or not.
pub(super) async fn list_plans(
    state: State<AppState>,
    MerchantSession(merchant): MerchantSession,
) -> Result<impl IntoResponse, MerchantApiError> {
    let plans = state
        .processor()
        .process(ListPlansByMerchant {
            merchant_id: merchant.id,
        })
        .await?;
    Ok(Json(
        plans.iter().map(PlanResponse::from).collect::<Vec<_>>(),
    ))
}

/// `POST /me/plans`: create a plan.
///
/// The token address is stored checksummed. `chain_id` defaults to the
/// chain the server is configured for.
pub(super) async fn create_plan(
    state: State<AppState>,
    MerchantSession(merchant): MerchantSession,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<impl IntoResponse, MerchantApiError> {
    let chain = state.config.chain.read().await.clone();
    let cmd = plan_from_request(
        merchant.id,
        payload,
        chain.chain_id,
        chain.token_decimals,
    )?;

    let plan = state.processor().process(cmd).await?;

    tracing::info!(merchant_id = %merchant.id, plan_id = plan.id, "Plan created");
    Ok((StatusCode::CREATED, Json(PlanResponse::from(&plan))))
}

/// Validate a plan request. The price must be payable in whole token units,
/// since vaults are swept for exactly that amount.
fn plan_from_request(
    merchant_id: Uuid,
    payload: CreatePlanRequest,
    configured_chain_id: u64,
    token_decimals: u32,
) -> Result<CreatePlan, MerchantApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(MerchantApiError::Invalid("plan name is required"));
    }
    if payload.price <= Decimal::ZERO {
        return Err(MerchantApiError::Invalid("price must be positive"));
    }
    if let Err(AmountError::TooPrecise { .. }) = to_token_units(payload.price, token_decimals) {
        return Err(MerchantApiError::Invalid(
            "price has more decimal places than the token supports",
        ));
    }
    let token: Address = payload
        .token_address
        .trim()
        .parse()
        .map_err(|_| MerchantApiError::Invalid("invalid token address"))?;
    let symbol = payload.token_symbol.trim();
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
        return Err(MerchantApiError::Invalid("invalid token symbol"));
    }
    let chain_id = match payload.chain_id {
        Some(id) => id,
        None => i64::try_from(configured_chain_id)
            .map_err(|_| MerchantApiError::Invalid("configured chain id is out of range"))?,
    };

    Ok(CreatePlan {
        merchant_id,
        name: name.to_string(),
        price: payload.price,
        interval: payload.interval.into(),
        token_address: token.to_checksum(None),
        token_symbol: symbol.to_string(),
        chain_id,
    })
}

/// `POST /me/plans/{plan_id}/deactivate`: stop new checkouts for a plan.
///
/// Existing subscriptions are untouched.
pub(super) async fn deactivate_plan(
    state: State<AppState>,
    MerchantSession(merchant): MerchantSession,
    Path(plan_id): Path<i64>,
) -> Result<impl IntoResponse, MerchantApiError> {
    let plan = state
        .processor()
        .process(DeactivatePlan {
            merchant_id: merchant.id,
            plan_id,
        })
        .await?
        .ok_or(MerchantApiError::PlanNotFound)?;
    Ok(Json(PlanResponse::from(&plan)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use payrail_sdk::objects::BillingInterval;

    fn request(price: &str) -> CreatePlanRequest {
        CreatePlanRequest {
            name: " Pro ".into(),
            price: price.parse().unwrap(),
            interval: BillingInterval::Monthly,
            token_address: "0x036cbd53842c5426634e7929541ec2318f3dcf7e".into(),
            token_symbol: "USDC".into(),
            chain_id: None,
        }
    }

    #[test]
    fn test_plan_request_is_normalized() {
        let cmd = plan_from_request(Uuid::nil(), request("9.99"), 84532, 6).unwrap();
        assert_eq!(cmd.name, "Pro");
        assert_eq!(cmd.chain_id, 84532);
        assert_eq!(
            cmd.token_address,
            "0x036CbD53842c5426634e7929541eC2318f3dCF7e"
        );
    }

    #[test]
    fn test_price_finer_than_token_is_rejected() {
        assert!(matches!(
            plan_from_request(Uuid::nil(), request("9.9999999"), 84532, 6),
            Err(MerchantApiError::Invalid(_))
        ));
        assert!(plan_from_request(Uuid::nil(), request("9.9999999"), 84532, 18).is_ok());
        assert!(plan_from_request(Uuid::nil(), request("9.990000"), 84532, 2).is_ok());
    }

    #[test]
    fn test_non_positive_price_is_rejected() {
        assert!(matches!(
            plan_from_request(Uuid::nil(), request("0"), 84532, 6),
            Err(MerchantApiError::Invalid("price must be positive"))
        ));
    }
}
