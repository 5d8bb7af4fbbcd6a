use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::models::{Purchase, PurchaseWithVideo, Rating, Video};
use crate::database::store::MarketStore;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// Professional view: owned videos plus every purchase and rating scoped to
/// those videos. The rows are returned uncorrelated; the client joins them by
/// video id.
#[derive(Debug, Serialize)]
pub struct ProfessionalDashboard {
    pub videos: Vec<Video>,
    pub purchases: Vec<Purchase>,
    pub ratings: Vec<Rating>,
}

/// Student view: own purchases denormalized with video details, plus own
/// ratings.
#[derive(Debug, Serialize)]
pub struct StudentDashboard {
    pub purchases: Vec<PurchaseWithVideo>,
    pub ratings: Vec<Rating>,
}

/// Composes the per-role dashboard views. Every query is scoped to the
/// caller's identity, so one professional never sees another's purchase or
/// rating rows, and one student never sees another's.
pub struct DashboardService {
    store: Arc<dyn MarketStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    pub async fn professional_dashboard(
        &self,
        caller: &AuthUser,
    ) -> Result<ProfessionalDashboard, ApiError> {
        if !caller.role.can_publish() {
            return Err(ApiError::forbidden("Professional account required"));
        }

        let videos = self.store.list_videos_by_owner(caller.user_id).await?;
        let video_ids: Vec<Uuid> = videos.iter().map(|v| v.id).collect();

        let purchases = self.store.list_purchases_for_videos(&video_ids).await?;
        let ratings = self.store.list_ratings_for_videos(&video_ids).await?;

        Ok(ProfessionalDashboard { videos, purchases, ratings })
    }

    pub async fn student_dashboard(&self, caller: &AuthUser) -> Result<StudentDashboard, ApiError> {
        if !caller.role.can_purchase() {
            return Err(ApiError::forbidden("Student account required"));
        }

        let purchases = self.store.list_purchases_with_videos(caller.user_id).await?;
        let ratings = self.store.list_ratings_by_user(caller.user_id).await?;

        Ok(StudentDashboard { purchases, ratings })
    }
}
