use axum::extract::Path;
use axum::{response::IntoResponse, Json};
use serde_json::json;
use uuid::Uuid;

use crate::database::store::{MarketStore, PgStore};
use crate::error::ApiError;

/// GET /api/professionals - directory with owned videos, public
pub async fn professional_list() -> Result<impl IntoResponse, ApiError> {
    let store = PgStore::connect().await?;
    let professionals = store.list_professionals_with_videos().await?;

    Ok(Json(json!({ "success": true, "data": professionals })))
}

/// GET /api/professionals/:id - single profile with videos, public
pub async fn professional_get(Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    let store = PgStore::connect().await?;
    let professional = store
        .get_professional_with_videos(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Professional not found"))?;

    Ok(Json(json!({ "success": true, "data": professional })))
}
