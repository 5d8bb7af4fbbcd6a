//! In-memory [`MarketStore`] used by unit tests. Mirrors the storage-level
//! uniqueness semantics of the Postgres store: one purchase and one rating
//! per (user, video), with the rating upsert overwriting in place.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Category, NewRating, NewUser, NewVideo, ProfessionalWithVideos, Purchase, PurchaseWithVideo,
    Rating, Role, User, Video, VideoWithDetails,
};
use crate::database::store::MarketStore;
use crate::middleware::AuthUser;

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    categories: Vec<Category>,
    videos: Vec<Video>,
    purchases: Vec<Purchase>,
    ratings: Vec<Rating>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

/// Caller identity for a stored user, as the auth middleware would inject it.
pub fn auth_for(user: &User) -> AuthUser {
    AuthUser { user_id: user.id, username: user.username.clone(), role: user.role }
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn add_user(&self, name: &str, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: format!("{}-{}", name.to_lowercase(), Uuid::new_v4().simple()),
            password_hash: String::new(),
            name: name.to_string(),
            role,
            profession: None,
            bio: None,
            experience: None,
            profile_image: None,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().users.push(user.clone());
        user
    }

    pub async fn add_professional(&self, name: &str) -> User {
        self.add_user(name, Role::Professional)
    }

    pub async fn add_student(&self, name: &str) -> User {
        self.add_user(name, Role::Student)
    }

    pub async fn add_category(&self, name: &str) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_name: name.to_string(),
            color: "#3A86FF".to_string(),
        };
        self.inner.lock().unwrap().categories.push(category.clone());
        category
    }

    pub async fn add_video(&self, owner: &User, category: &Category, price: Decimal) -> Video {
        let video = Video {
            id: Uuid::new_v4(),
            user_id: owner.id,
            category_id: category.id,
            title: format!("Vlog de {}", owner.name),
            description: "Um dia de trabalho".to_string(),
            price,
            duration: 480,
            thumbnail_url: None,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().videos.push(video.clone());
        video
    }

    fn details_for(inner: &Inner, video: &Video) -> Option<VideoWithDetails> {
        let category = inner.categories.iter().find(|c| c.id == video.category_id)?.clone();
        let owner = inner.users.iter().find(|u| u.id == video.user_id)?;

        let scores: Vec<i16> = inner
            .ratings
            .iter()
            .filter(|r| r.video_id == video.id)
            .map(|r| r.score)
            .collect();
        let rating_count = scores.len() as i64;
        let average_rating = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64)
        };

        Some(VideoWithDetails {
            video: video.clone(),
            category,
            professional: owner.profile(),
            average_rating,
            rating_count,
        })
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> Result<Option<User>, DatabaseError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.username == new.username) {
            return Ok(None);
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            password_hash: new.password_hash,
            name: new.name,
            role: new.role,
            profession: new.profession,
            bio: new.bio,
            experience: new.experience,
            profile_image: new.profile_image,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(Some(user))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let mut categories = self.inner.lock().unwrap().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_video(&self, new: NewVideo) -> Result<Video, DatabaseError> {
        let video = Video {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            category_id: new.category_id,
            title: new.title,
            description: new.description,
            price: new.price,
            duration: new.duration,
            thumbnail_url: new.thumbnail_url,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().videos.push(video.clone());
        Ok(video)
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.videos.iter().find(|v| v.id == id).cloned())
    }

    async fn get_video_with_details(
        &self,
        id: Uuid,
    ) -> Result<Option<VideoWithDetails>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        let video = inner.videos.iter().find(|v| v.id == id).cloned();
        Ok(video.and_then(|v| Self::details_for(&inner, &v)))
    }

    async fn list_videos_with_details(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<VideoWithDetails>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .videos
            .iter()
            .filter(|v| category_id.map_or(true, |c| v.category_id == c))
            .filter_map(|v| Self::details_for(&inner, v))
            .collect())
    }

    async fn list_videos_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.videos.iter().filter(|v| v.user_id == owner_id).cloned().collect())
    }

    async fn list_professionals_with_videos(
        &self,
    ) -> Result<Vec<ProfessionalWithVideos>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .filter(|u| u.role == Role::Professional)
            .map(|u| ProfessionalWithVideos {
                professional: u.profile(),
                videos: inner.videos.iter().filter(|v| v.user_id == u.id).cloned().collect(),
            })
            .collect())
    }

    async fn get_professional_with_videos(
        &self,
        id: Uuid,
    ) -> Result<Option<ProfessionalWithVideos>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.id == id && u.role == Role::Professional)
            .map(|u| ProfessionalWithVideos {
                professional: u.profile(),
                videos: inner.videos.iter().filter(|v| v.user_id == u.id).cloned().collect(),
            }))
    }

    async fn insert_purchase(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<Purchase>, DatabaseError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.purchases.iter().any(|p| p.user_id == user_id && p.video_id == video_id) {
            return Ok(None);
        }

        let purchase =
            Purchase { id: Uuid::new_v4(), user_id, video_id, created_at: Utc::now() };
        inner.purchases.push(purchase.clone());
        Ok(Some(purchase))
    }

    async fn get_purchase(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<Purchase>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .purchases
            .iter()
            .find(|p| p.user_id == user_id && p.video_id == video_id)
            .cloned())
    }

    async fn list_purchases_by_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.purchases.iter().filter(|p| p.user_id == user_id).cloned().collect())
    }

    async fn list_purchases_for_videos(
        &self,
        video_ids: &[Uuid],
    ) -> Result<Vec<Purchase>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .purchases
            .iter()
            .filter(|p| video_ids.contains(&p.video_id))
            .cloned()
            .collect())
    }

    async fn list_purchases_with_videos(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PurchaseWithVideo>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .purchases
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                let video = inner.videos.iter().find(|v| v.id == p.video_id)?;
                Some(PurchaseWithVideo {
                    purchase: p.clone(),
                    video: Self::details_for(&inner, video)?,
                })
            })
            .collect())
    }

    async fn upsert_rating(&self, new: NewRating) -> Result<(Rating, bool), DatabaseError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(existing) = inner
            .ratings
            .iter_mut()
            .find(|r| r.user_id == new.user_id && r.video_id == new.video_id)
        {
            existing.score = new.score;
            existing.comment = new.comment;
            existing.updated_at = Utc::now();
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let rating = Rating {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            video_id: new.video_id,
            score: new.score,
            comment: new.comment,
            created_at: now,
            updated_at: now,
        };
        inner.ratings.push(rating.clone());
        Ok((rating, true))
    }

    async fn list_ratings_for_video(&self, video_id: Uuid) -> Result<Vec<Rating>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.ratings.iter().filter(|r| r.video_id == video_id).cloned().collect())
    }

    async fn list_ratings_for_videos(
        &self,
        video_ids: &[Uuid],
    ) -> Result<Vec<Rating>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .ratings
            .iter()
            .filter(|r| video_ids.contains(&r.video_id))
            .cloned()
            .collect())
    }

    async fn list_ratings_by_user(&self, user_id: Uuid) -> Result<Vec<Rating>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.ratings.iter().filter(|r| r.user_id == user_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn aggregate_average_is_mean_of_scores() {
        let store = MemoryStore::new();
        let pro = store.add_professional("Paulo").await;
        let category = store.add_category("technology").await;
        let video = store.add_video(&pro, &category, dec!(29.90)).await;

        // No ratings yet: undefined average, never a division by zero
        let details = store.get_video_with_details(video.id).await.unwrap().unwrap();
        assert_eq!(details.average_rating, None);
        assert_eq!(details.rating_count, 0);

        for (student, score) in [("A", 2i16), ("B", 3), ("C", 4)] {
            let user = store.add_student(student).await;
            store
                .upsert_rating(NewRating {
                    user_id: user.id,
                    video_id: video.id,
                    score,
                    comment: None,
                })
                .await
                .unwrap();
        }

        let details = store.get_video_with_details(video.id).await.unwrap().unwrap();
        assert_eq!(details.average_rating, Some(3.0));
        assert_eq!(details.rating_count, 3);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        let new_user = |username: &str| NewUser {
            username: username.to_string(),
            password_hash: "salt$digest".to_string(),
            name: "Maria".to_string(),
            role: Role::Student,
            profession: None,
            bio: None,
            experience: None,
            profile_image: None,
        };

        assert!(store.insert_user(new_user("maria")).await.unwrap().is_some());
        assert!(store.insert_user(new_user("maria")).await.unwrap().is_none());
    }
}
