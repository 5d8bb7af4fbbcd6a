use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

/// Errors from DatabaseManager and the stores built on top of it
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Advisory lock key guarding the startup migration/seed step so concurrent
/// replicas do not race on DDL.
const BOOTSTRAP_LOCK_KEY: i64 = 0x7076_6c6f_675f_6201; // "pvlog_b"

/// Centralized connection pool manager. One pool per process, created lazily
/// from DATABASE_URL.
pub struct DatabaseManager {
    pool: OnceCell<PgPool>,
}

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager { pool: OnceCell::new() })
    }

    /// Get the shared application pool, creating it on first use.
    pub async fn pool() -> Result<PgPool, DatabaseError> {
        let manager = Self::instance();
        let pool = manager
            .pool
            .get_or_try_init(|| async {
                let url = std::env::var("DATABASE_URL")
                    .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;
                let config = crate::config::config();

                let pool = PgPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .acquire_timeout(Duration::from_secs(config.database.connection_timeout))
                    .connect(&url)
                    .await?;

                info!("Created database pool");
                Ok::<PgPool, DatabaseError>(pool)
            })
            .await?;
        Ok(pool.clone())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Idempotent schema migration plus category seeding, run once at startup
    /// under a session advisory lock.
    ///
    /// The (user_id, video_id) uniqueness for purchases and ratings lives here
    /// as real constraints: duplicate detection and the rating upsert rely on
    /// them rather than on application-level pre-checks.
    pub async fn bootstrap() -> Result<(), DatabaseError> {
        let pool = Self::pool().await?;
        let mut conn = pool.acquire().await?;

        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(BOOTSTRAP_LOCK_KEY)
            .execute(&mut *conn)
            .await?;

        let result = Self::run_migrations(&mut conn).await;

        // Always release the lock, even when DDL failed.
        let _ = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(BOOTSTRAP_LOCK_KEY)
            .execute(&mut *conn)
            .await;

        result?;
        crate::database::bootstrap::seed_categories(&pool).await?;

        info!("Database bootstrap complete");
        Ok(())
    }

    async fn run_migrations(conn: &mut sqlx::PgConnection) -> Result<(), DatabaseError> {
        let statements = [
            r#"
            DO $$ BEGIN
                CREATE TYPE user_role AS ENUM ('professional', 'student');
            EXCEPTION
                WHEN duplicate_object THEN NULL;
            END $$
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id            UUID PRIMARY KEY,
                username      TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                name          TEXT NOT NULL,
                role          user_role NOT NULL,
                profession    TEXT,
                bio           TEXT,
                experience    INTEGER,
                profile_image TEXT,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id           UUID PRIMARY KEY,
                name         TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                color        TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                id            UUID PRIMARY KEY,
                user_id       UUID NOT NULL REFERENCES users(id),
                category_id   UUID NOT NULL REFERENCES categories(id),
                title         TEXT NOT NULL,
                description   TEXT NOT NULL,
                price         NUMERIC(10, 2) NOT NULL CHECK (price >= 0),
                duration      INTEGER NOT NULL CHECK (duration > 0),
                thumbnail_url TEXT,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS purchases (
                id         UUID PRIMARY KEY,
                user_id    UUID NOT NULL REFERENCES users(id),
                video_id   UUID NOT NULL REFERENCES videos(id),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (user_id, video_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS ratings (
                id         UUID PRIMARY KEY,
                user_id    UUID NOT NULL REFERENCES users(id),
                video_id   UUID NOT NULL REFERENCES videos(id),
                score      SMALLINT NOT NULL CHECK (score BETWEEN 1 AND 5),
                comment    TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (user_id, video_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_videos_category ON videos (category_id)",
            "CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos (user_id)",
            "CREATE INDEX IF NOT EXISTS idx_purchases_video ON purchases (video_id)",
            "CREATE INDEX IF NOT EXISTS idx_ratings_video ON ratings (video_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&mut *conn)
                .await
                .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
        }

        Ok(())
    }
}
