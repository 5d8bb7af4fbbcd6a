use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

/// Closed set of account roles. Role is fixed at registration and decides
/// which operations a caller may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Professional,
    Student,
}

impl Role {
    /// Professionals publish and own videos.
    pub fn can_publish(&self) -> bool {
        matches!(self, Role::Professional)
    }

    /// Students purchase videos and rate the ones they bought.
    pub fn can_purchase(&self) -> bool {
        matches!(self, Role::Student)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Professional => "professional",
            Role::Student => "student",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub profession: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<i32>,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public-facing subset of a professional account, safe to embed in
    /// catalog responses.
    pub fn profile(&self) -> ProfessionalProfile {
        ProfessionalProfile {
            id: self.id,
            name: self.name.clone(),
            profession: self.profession.clone(),
            experience: self.experience,
            profile_image: self.profile_image.clone(),
            bio: self.bio.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub profession: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<i32>,
    pub profile_image: Option<String>,
}

/// Reference data: profession categories, seeded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    /// Running time in seconds.
    pub duration: i32,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub duration: i32,
    pub thumbnail_url: Option<String>,
}

/// One student's purchase of one video. At most one row per (user, video),
/// enforced by a storage-level unique constraint.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// One student's rating of one purchased video. At most one row per
/// (user, video); repeat submissions overwrite score/comment in place.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRating {
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
}

/// Public professional profile embedded in read views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalProfile {
    pub id: Uuid,
    pub name: String,
    pub profession: Option<String>,
    pub experience: Option<i32>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
}

/// Read-time composition of a video with its category, owning professional
/// and rating aggregate. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoWithDetails {
    #[serde(flatten)]
    pub video: Video,
    pub category: Category,
    pub professional: ProfessionalProfile,
    /// Arithmetic mean of all rating scores; None when the video has no
    /// ratings yet.
    pub average_rating: Option<f64>,
    pub rating_count: i64,
}

impl FromRow<'_, PgRow> for VideoWithDetails {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let user_id: Uuid = row.try_get("user_id")?;
        let category_id: Uuid = row.try_get("category_id")?;

        Ok(Self {
            video: Video {
                id: row.try_get("id")?,
                user_id,
                category_id,
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                price: row.try_get("price")?,
                duration: row.try_get("duration")?,
                thumbnail_url: row.try_get("thumbnail_url")?,
                created_at: row.try_get("created_at")?,
            },
            category: Category {
                id: category_id,
                name: row.try_get("category_name")?,
                display_name: row.try_get("category_display_name")?,
                color: row.try_get("category_color")?,
            },
            professional: ProfessionalProfile {
                id: user_id,
                name: row.try_get("professional_name")?,
                profession: row.try_get("profession")?,
                experience: row.try_get("experience")?,
                profile_image: row.try_get("profile_image")?,
                bio: row.try_get("bio")?,
            },
            average_rating: row.try_get("average_rating")?,
            rating_count: row.try_get("rating_count")?,
        })
    }
}

/// Student dashboard row: a purchase denormalized with full video details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseWithVideo {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub video: VideoWithDetails,
}

/// Professional directory entry with the videos they own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalWithVideos {
    #[serde(flatten)]
    pub professional: ProfessionalProfile,
    pub videos: Vec<Video>,
}
