use axum::extract::{Path, Query};
use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::{MarketStore, PgStore};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::entitlement::VideoDraft;
use crate::services::EntitlementService;

#[derive(Debug, Deserialize)]
pub struct VideoListQuery {
    pub category_id: Option<Uuid>,
}

/// GET /api/videos[?category_id=] - catalog with details, public
pub async fn video_list(
    Query(query): Query<VideoListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let store = PgStore::connect().await?;
    let videos = store.list_videos_with_details(query.category_id).await?;

    Ok(Json(json!({ "success": true, "data": videos })))
}

/// GET /api/videos/:id - single video with details, public
pub async fn video_get(Path(id): Path<Uuid>) -> Result<impl IntoResponse, ApiError> {
    let store = PgStore::connect().await?;
    let video = store
        .get_video_with_details(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(Json(json!({ "success": true, "data": video })))
}

/// POST /api/videos - publish a video, professional only
pub async fn video_post(
    Extension(caller): Extension<AuthUser>,
    Json(draft): Json<VideoDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let store = Arc::new(PgStore::connect().await?);
    let video = EntitlementService::new(store).create_video(&caller, draft).await?;

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": video }))))
}
