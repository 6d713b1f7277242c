use std::collections::HashMap;

use alloy_primitives::Address;
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use kanau::processor::Processor;
use payrail_core::entities::deposit_vaults::ListVaultsBySubscriptions;
use payrail_core::entities::subscriptions::ListSubscriberSubscriptions;
use payrail_sdk::objects::PortalSubscription;
use serde::Deserialize;

use crate::api::checkout::CheckoutApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct SubscriberQuery {
    subscriber: String,
}

/// `GET /subscriptions?subscriber=0x…`: newest first, each with its vault
/// when it has one.
///
/// Addresses are stored checksummed, so the query is normalized before the
/// lookup and any casing matches.
pub(super) async fn list_subscriptions(
    state: State<AppState>,
    Query(query): Query<SubscriberQuery>,
) -> Result<impl IntoResponse, CheckoutApiError> {
    let raw = query.subscriber.trim();
    let subscriber: Address = raw
        .parse()
        .map_err(|_| CheckoutApiError::invalid_address(raw))?;

    let processor = state.processor();
    let rows = processor
        .process(ListSubscriberSubscriptions {
            subscriber_address: subscriber.to_checksum(None),
        })
        .await?;
    if rows.is_empty() {
        return Ok(Json(Vec::<PortalSubscription>::new()));
    }

    let vaults = processor
        .process(ListVaultsBySubscriptions {
            subscription_ids: rows.iter().map(|row| row.subscription.id).collect(),
        })
        .await?;
    let vaults: HashMap<_, _> = vaults
        .iter()
        .map(|vault| (vault.subscription_id, vault))
        .collect();

    Ok(Json(
        rows.iter()
            .map(|row| row.to_portal(vaults.get(&row.subscription.id).copied()))
            .collect::<Vec<_>>(),
    ))
}
