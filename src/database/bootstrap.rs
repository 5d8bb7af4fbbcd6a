use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Profession categories shipped with the marketplace. Seeded idempotently at
/// startup; ON CONFLICT on the unique name keeps re-runs and concurrent
/// replicas harmless.
const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("technology", "Tecnologia", "#3A86FF"),
    ("health", "Saúde", "#28A745"),
    ("engineering", "Engenharia", "#FFC107"),
    ("law", "Direito", "#0D47A1"),
    ("education", "Educação", "#6A1B9A"),
    ("marketing", "Marketing", "#DC3545"),
    ("finance", "Finanças", "#198754"),
    ("arts", "Artes", "#F44336"),
];

pub async fn seed_categories(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut inserted = 0u64;

    for (name, display_name, color) in DEFAULT_CATEGORIES {
        let result = sqlx::query(
            "INSERT INTO categories (id, name, display_name, color) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(display_name)
        .bind(color)
        .execute(pool)
        .await?;

        inserted += result.rows_affected();
    }

    if inserted > 0 {
        info!("Seeded {} categories", inserted);
    }

    Ok(())
}
