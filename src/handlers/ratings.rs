use axum::extract::Path;
use axum::{http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::{MarketStore, PgStore};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::entitlement::RatingDraft;
use crate::services::EntitlementService;

/// POST /api/ratings - create or revise a rating, student with prior
/// purchase only. 201 when a new rating was created, 200 when the caller's
/// existing rating was updated in place.
pub async fn rating_post(
    Extension(caller): Extension<AuthUser>,
    Json(draft): Json<RatingDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let store = Arc::new(PgStore::connect().await?);
    let outcome = EntitlementService::new(store).submit_rating(&caller, draft).await?;

    let status = if outcome.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(json!({ "success": true, "data": outcome.rating }))))
}

/// GET /api/ratings/video/:id - ratings for a video, public
pub async fn rating_list_for_video(
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let store = PgStore::connect().await?;
    let ratings = store.list_ratings_for_video(video_id).await?;

    Ok(Json(json!({ "success": true, "data": ratings })))
}
