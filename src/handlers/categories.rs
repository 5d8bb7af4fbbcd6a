use axum::{response::IntoResponse, Json};
use serde_json::json;

use crate::database::store::{MarketStore, PgStore};
use crate::error::ApiError;

/// GET /api/categories - reference data, public
pub async fn category_list() -> Result<impl IntoResponse, ApiError> {
    let store = PgStore::connect().await?;
    let categories = store.list_categories().await?;

    Ok(Json(json!({ "success": true, "data": categories })))
}
