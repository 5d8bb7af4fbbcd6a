use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{NewRating, NewVideo, Purchase, Rating, Video};
use crate::database::store::MarketStore;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Video creation payload as submitted by the client. The owner is never
/// taken from the payload; it is forced to the authenticated caller.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoDraft {
    pub category_id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub duration: i32,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingDraft {
    pub video_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
}

/// Outcome of a rating submission: the stored row plus whether it was newly
/// created (201) or an in-place update of the caller's earlier rating (200).
#[derive(Debug, Clone)]
pub struct RatingOutcome {
    pub rating: Rating,
    pub created: bool,
}

/// Enforces the marketplace business invariants: purchase-before-rate,
/// one purchase per (student, video), rating upsert by natural key, and
/// professional-only video publishing with owner anti-spoofing.
pub struct EntitlementService {
    store: Arc<dyn MarketStore>,
}

impl EntitlementService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// Record a student's purchase of a video. The duplicate check is atomic
    /// at the storage layer; a second purchase for the same (user, video)
    /// pair fails with Conflict and leaves exactly one row.
    pub async fn submit_purchase(
        &self,
        caller: &AuthUser,
        video_id: Uuid,
    ) -> Result<Purchase, ApiError> {
        if !caller.role.can_purchase() {
            return Err(ApiError::forbidden("Only students can make purchases"));
        }

        if self.store.get_video(video_id).await?.is_none() {
            return Err(ApiError::not_found("Video not found"));
        }

        match self.store.insert_purchase(caller.user_id, video_id).await? {
            Some(purchase) => {
                tracing::info!(user = %caller.user_id, video = %video_id, "purchase recorded");
                Ok(purchase)
            }
            None => Err(ApiError::conflict("Video already purchased")),
        }
    }

    /// Submit or revise a rating. Requires a prior purchase by the caller.
    /// A repeat submission for the same video overwrites the existing row in
    /// place; it never creates a second one.
    pub async fn submit_rating(
        &self,
        caller: &AuthUser,
        draft: RatingDraft,
    ) -> Result<RatingOutcome, ApiError> {
        if !caller.role.can_purchase() {
            return Err(ApiError::forbidden("Only students can create ratings"));
        }

        if !(1..=5).contains(&draft.score) {
            let mut fields = HashMap::new();
            fields.insert("score".to_string(), "Score must be between 1 and 5".to_string());
            return Err(ApiError::validation_error("Invalid rating data", Some(fields)));
        }

        if self.store.get_video(draft.video_id).await?.is_none() {
            return Err(ApiError::not_found("Video not found"));
        }

        if self.store.get_purchase(caller.user_id, draft.video_id).await?.is_none() {
            return Err(ApiError::forbidden("You must purchase the video before rating it"));
        }

        let (rating, created) = self
            .store
            .upsert_rating(NewRating {
                user_id: caller.user_id,
                video_id: draft.video_id,
                score: draft.score,
                comment: draft.comment,
            })
            .await?;

        tracing::info!(
            user = %caller.user_id,
            video = %draft.video_id,
            created,
            "rating stored"
        );

        Ok(RatingOutcome { rating, created })
    }

    /// Publish a video. Professional-only; the owner field is always the
    /// caller, ignoring whatever the payload claims.
    pub async fn create_video(
        &self,
        caller: &AuthUser,
        draft: VideoDraft,
    ) -> Result<Video, ApiError> {
        if !caller.role.can_publish() {
            return Err(ApiError::forbidden("Only professionals can create videos"));
        }

        let mut fields = HashMap::new();
        if draft.title.trim().is_empty() {
            fields.insert("title".to_string(), "This field is required".to_string());
        }
        if draft.description.trim().is_empty() {
            fields.insert("description".to_string(), "This field is required".to_string());
        }
        if draft.price < Decimal::ZERO {
            fields.insert("price".to_string(), "Price cannot be negative".to_string());
        }
        if draft.duration <= 0 {
            fields.insert("duration".to_string(), "Duration must be positive".to_string());
        }
        if self.store.get_category(draft.category_id).await?.is_none() {
            fields.insert("category_id".to_string(), "Unknown category".to_string());
        }

        if !fields.is_empty() {
            return Err(ApiError::validation_error("Invalid video data", Some(fields)));
        }

        let video = self
            .store
            .insert_video(NewVideo {
                user_id: caller.user_id,
                category_id: draft.category_id,
                title: draft.title,
                description: draft.description,
                price: draft.price,
                duration: draft.duration,
                thumbnail_url: draft.thumbnail_url,
            })
            .await?;

        tracing::info!(owner = %caller.user_id, video = %video.id, "video published");
        Ok(video)
    }
}
