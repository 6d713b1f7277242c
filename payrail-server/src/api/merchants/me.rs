use axum::Json;
use payrail_sdk::objects::MerchantResponse;

use crate::api::extractors::MerchantSession;

/// `GET /me`: the merchant behind the session.
pub(super) async fn get_me(MerchantSession(merchant): MerchantSession) -> Json<MerchantResponse> {
    Json(MerchantResponse::from(&merchant))
}
