use axum::{response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::database::store::PgStore;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::DashboardService;

/// GET /api/dashboard/professional - owned videos with their purchases and
/// ratings, scoped strictly to the caller
pub async fn professional_dashboard(
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let store = Arc::new(PgStore::connect().await?);
    let view = DashboardService::new(store).professional_dashboard(&caller).await?;

    Ok(Json(json!({ "success": true, "data": view })))
}

/// GET /api/dashboard/student - caller's purchases with video details plus
/// their own ratings
pub async fn student_dashboard(
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let store = Arc::new(PgStore::connect().await?);
    let view = DashboardService::new(store).student_dashboard(&caller).await?;

    Ok(Json(json!({ "success": true, "data": view })))
}
