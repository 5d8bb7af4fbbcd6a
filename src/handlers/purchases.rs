use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::{MarketStore, PgStore};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::EntitlementService;

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub video_id: Uuid,
}

/// POST /api/purchases - record a purchase, student only.
/// A repeat purchase of the same video is a 409.
pub async fn purchase_post(
    Extension(caller): Extension<AuthUser>,
    Json(body): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = Arc::new(PgStore::connect().await?);
    let purchase = EntitlementService::new(store).submit_purchase(&caller, body.video_id).await?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": purchase }))))
}

/// GET /api/purchases/user - caller's own purchases
pub async fn purchase_list_user(
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let store = PgStore::connect().await?;
    let purchases = store.list_purchases_by_user(caller.user_id).await?;

    Ok(Json(json!({ "success": true, "data": purchases })))
}
