use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Category, NewRating, NewUser, NewVideo, ProfessionalWithVideos, Purchase, PurchaseWithVideo,
    Rating, User, Video, VideoWithDetails,
};

/// Persistence contract for the marketplace entities and their composed read
/// views. The Postgres implementation is [`PgStore`]; tests use an in-memory
/// implementation with the same uniqueness semantics.
///
/// Duplicate detection for purchases and the rating upsert are single atomic
/// statements backed by a (user_id, video_id) unique constraint, so the
/// invariants hold under concurrent submissions.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // Users
    /// Returns None when the username is already taken.
    async fn insert_user(&self, new: NewUser) -> Result<Option<User>, DatabaseError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, DatabaseError>;

    // Videos
    async fn insert_video(&self, new: NewVideo) -> Result<Video, DatabaseError>;
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, DatabaseError>;
    async fn get_video_with_details(
        &self,
        id: Uuid,
    ) -> Result<Option<VideoWithDetails>, DatabaseError>;
    async fn list_videos_with_details(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<VideoWithDetails>, DatabaseError>;
    async fn list_videos_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>, DatabaseError>;

    // Professionals
    async fn list_professionals_with_videos(
        &self,
    ) -> Result<Vec<ProfessionalWithVideos>, DatabaseError>;
    async fn get_professional_with_videos(
        &self,
        id: Uuid,
    ) -> Result<Option<ProfessionalWithVideos>, DatabaseError>;

    // Purchases
    /// Atomic insert; returns None when a purchase for (user, video) already
    /// exists.
    async fn insert_purchase(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<Purchase>, DatabaseError>;
    async fn get_purchase(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<Purchase>, DatabaseError>;
    async fn list_purchases_by_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, DatabaseError>;
    async fn list_purchases_for_videos(
        &self,
        video_ids: &[Uuid],
    ) -> Result<Vec<Purchase>, DatabaseError>;
    async fn list_purchases_with_videos(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PurchaseWithVideo>, DatabaseError>;

    // Ratings
    /// Atomic insert-or-update keyed by (user, video). The returned flag is
    /// true when a new row was created, false when an existing one was
    /// overwritten in place.
    async fn upsert_rating(&self, new: NewRating) -> Result<(Rating, bool), DatabaseError>;
    async fn list_ratings_for_video(&self, video_id: Uuid) -> Result<Vec<Rating>, DatabaseError>;
    async fn list_ratings_for_videos(
        &self,
        video_ids: &[Uuid],
    ) -> Result<Vec<Rating>, DatabaseError>;
    async fn list_ratings_by_user(&self, user_id: Uuid) -> Result<Vec<Rating>, DatabaseError>;
}

/// Columns shared by every VideoWithDetails query. The aggregate average is
/// NULL (never a division by zero) when a video has no ratings.
const VIDEO_DETAILS_SELECT: &str = "\
    SELECT v.id, v.user_id, v.category_id, v.title, v.description, v.price, v.duration, \
           v.thumbnail_url, v.created_at, \
           c.name AS category_name, c.display_name AS category_display_name, \
           c.color AS category_color, \
           u.name AS professional_name, u.profession, u.experience, u.profile_image, u.bio, \
           AVG(r.score)::float8 AS average_rating, \
           COUNT(r.id) AS rating_count \
      FROM videos v \
      JOIN categories c ON c.id = v.category_id \
      JOIN users u ON u.id = v.user_id \
      LEFT JOIN ratings r ON r.video_id = v.id";

const VIDEO_DETAILS_GROUP: &str = " GROUP BY v.id, c.id, u.id";

/// PostgreSQL-backed [`MarketStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store over the shared application pool.
    pub async fn connect() -> Result<Self, DatabaseError> {
        Ok(Self::new(DatabaseManager::pool().await?))
    }

    async fn video_details_by_ids(
        &self,
        video_ids: &[Uuid],
    ) -> Result<Vec<VideoWithDetails>, DatabaseError> {
        if video_ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!(
            "{} WHERE v.id = ANY($1){} ORDER BY v.created_at DESC",
            VIDEO_DETAILS_SELECT, VIDEO_DETAILS_GROUP
        );

        Ok(sqlx::query_as::<_, VideoWithDetails>(&sql)
            .bind(video_ids)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn insert_user(&self, new: NewUser) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users \
                 (id, username, password_hash, name, role, profession, bio, experience, profile_image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (username) DO NOTHING \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.name)
        .bind(new.role)
        .bind(&new.profession)
        .bind(&new.bio)
        .bind(new.experience)
        .bind(&new.profile_image)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, DatabaseError> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_video(&self, new: NewVideo) -> Result<Video, DatabaseError> {
        Ok(sqlx::query_as::<_, Video>(
            "INSERT INTO videos \
                 (id, user_id, category_id, title, description, price, duration, thumbnail_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.category_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.duration)
        .bind(&new.thumbnail_url)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, DatabaseError> {
        Ok(sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_video_with_details(
        &self,
        id: Uuid,
    ) -> Result<Option<VideoWithDetails>, DatabaseError> {
        let sql = format!("{} WHERE v.id = $1{}", VIDEO_DETAILS_SELECT, VIDEO_DETAILS_GROUP);

        Ok(sqlx::query_as::<_, VideoWithDetails>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_videos_with_details(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<VideoWithDetails>, DatabaseError> {
        let videos = match category_id {
            Some(category_id) => {
                let sql = format!(
                    "{} WHERE v.category_id = $1{} ORDER BY v.created_at DESC",
                    VIDEO_DETAILS_SELECT, VIDEO_DETAILS_GROUP
                );
                sqlx::query_as::<_, VideoWithDetails>(&sql)
                    .bind(category_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    "{}{} ORDER BY v.created_at DESC",
                    VIDEO_DETAILS_SELECT, VIDEO_DETAILS_GROUP
                );
                sqlx::query_as::<_, VideoWithDetails>(&sql).fetch_all(&self.pool).await?
            }
        };

        Ok(videos)
    }

    async fn list_videos_by_owner(&self, owner_id: Uuid) -> Result<Vec<Video>, DatabaseError> {
        Ok(sqlx::query_as::<_, Video>(
            "SELECT * FROM videos WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_professionals_with_videos(
        &self,
    ) -> Result<Vec<ProfessionalWithVideos>, DatabaseError> {
        let professionals = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE role = 'professional' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let owner_ids: Vec<Uuid> = professionals.iter().map(|p| p.id).collect();
        let mut videos = if owner_ids.is_empty() {
            vec![]
        } else {
            sqlx::query_as::<_, Video>(
                "SELECT * FROM videos WHERE user_id = ANY($1) ORDER BY created_at DESC",
            )
            .bind(&owner_ids)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(professionals
            .into_iter()
            .map(|professional| {
                let owned: Vec<Video> = videos
                    .iter()
                    .filter(|v| v.user_id == professional.id)
                    .cloned()
                    .collect();
                videos.retain(|v| v.user_id != professional.id);
                ProfessionalWithVideos { professional: professional.profile(), videos: owned }
            })
            .collect())
    }

    async fn get_professional_with_videos(
        &self,
        id: Uuid,
    ) -> Result<Option<ProfessionalWithVideos>, DatabaseError> {
        let professional = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND role = 'professional'",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(professional) = professional else {
            return Ok(None);
        };

        let videos = self.list_videos_by_owner(professional.id).await?;
        Ok(Some(ProfessionalWithVideos { professional: professional.profile(), videos }))
    }

    async fn insert_purchase(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<Purchase>, DatabaseError> {
        // ON CONFLICT makes the duplicate check atomic; no read-then-write
        // window under concurrent submissions.
        Ok(sqlx::query_as::<_, Purchase>(
            "INSERT INTO purchases (id, user_id, video_id) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, video_id) DO NOTHING \
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_purchase(
        &self,
        user_id: Uuid,
        video_id: Uuid,
    ) -> Result<Option<Purchase>, DatabaseError> {
        Ok(sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE user_id = $1 AND video_id = $2",
        )
        .bind(user_id)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_purchases_by_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, DatabaseError> {
        Ok(sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_purchases_for_videos(
        &self,
        video_ids: &[Uuid],
    ) -> Result<Vec<Purchase>, DatabaseError> {
        if video_ids.is_empty() {
            return Ok(vec![]);
        }

        Ok(sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE video_id = ANY($1) ORDER BY created_at DESC",
        )
        .bind(video_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_purchases_with_videos(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<PurchaseWithVideo>, DatabaseError> {
        let purchases = self.list_purchases_by_user(user_id).await?;
        let video_ids: Vec<Uuid> = purchases.iter().map(|p| p.video_id).collect();
        let details = self.video_details_by_ids(&video_ids).await?;

        Ok(purchases
            .into_iter()
            .filter_map(|purchase| {
                details
                    .iter()
                    .find(|d| d.video.id == purchase.video_id)
                    .cloned()
                    .map(|video| PurchaseWithVideo { purchase, video })
            })
            .collect())
    }

    async fn upsert_rating(&self, new: NewRating) -> Result<(Rating, bool), DatabaseError> {
        // Atomic upsert on the (user_id, video_id) natural key. xmax = 0
        // distinguishes a fresh insert from an in-place update.
        let row = sqlx::query(
            "INSERT INTO ratings (id, user_id, video_id, score, comment) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, video_id) DO UPDATE \
                 SET score = EXCLUDED.score, \
                     comment = EXCLUDED.comment, \
                     updated_at = now() \
             RETURNING id, user_id, video_id, score, comment, created_at, updated_at, \
                       (xmax = 0) AS created",
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.video_id)
        .bind(new.score)
        .bind(&new.comment)
        .fetch_one(&self.pool)
        .await?;

        let rating = Rating {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            video_id: row.try_get("video_id")?,
            score: row.try_get("score")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        };
        let created: bool = row.try_get("created")?;

        Ok((rating, created))
    }

    async fn list_ratings_for_video(&self, video_id: Uuid) -> Result<Vec<Rating>, DatabaseError> {
        Ok(sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE video_id = $1 ORDER BY updated_at DESC",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_ratings_for_videos(
        &self,
        video_ids: &[Uuid],
    ) -> Result<Vec<Rating>, DatabaseError> {
        if video_ids.is_empty() {
            return Ok(vec![]);
        }

        Ok(sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE video_id = ANY($1) ORDER BY updated_at DESC",
        )
        .bind(video_ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_ratings_by_user(&self, user_id: Uuid) -> Result<Vec<Rating>, DatabaseError> {
        Ok(sqlx::query_as::<_, Rating>(
            "SELECT * FROM ratings WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
