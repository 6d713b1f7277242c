use axum::{Json, extract::State};
use kanau::processor::Processor;
use payrail_core::entities::merchants::GetMerchantStats;
use payrail_sdk::objects::DashboardStats;

use crate::api::extractors::MerchantSession;
use crate::state::AppState;

/// `GET /me/stats`: dashboard counters.
///
/// Best effort: a failed query is logged and answered with zeroed counters
/// and the revenue stored on the merchant row, so the dashboard still loads.
pub(super) async fn get_stats(
    state: State<AppState>,
    MerchantSession(merchant): MerchantSession,
) -> Json<DashboardStats> {
    let stats = match state
        .processor()
        .process(GetMerchantStats {
            merchant_id: merchant.id,
        })
        .await
    {
        Ok(stats) => stats.into(),
        Err(e) => {
            tracing::error!(merchant_id = %merchant.id, error = %e, "Failed to load merchant stats");
            DashboardStats {
                total_revenue: merchant.total_revenue,
                ..DashboardStats::default()
            }
        }
    };
    Json(stats)
}
