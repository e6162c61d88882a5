use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::error::ApiError;
use crate::models::MysteryBox;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Column list shared by every box query
pub const BOX_COLUMNS: &str = "id, name, description, category, price, image_url, stock, \
    low_stock_threshold, overstock_threshold, is_active, rating, review_count, created_at, updated_at";

/// Creates and configures a PostgreSQL connection pool
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
/// * `max_connections` - Upper bound on pooled connections
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    tracing::debug!("Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}

/// Check if a box with the given name already exists
pub async fn check_duplicate_box(pool: &PgPool, name: &str) -> Result<bool, ApiError> {
    tracing::debug!("Checking for duplicate box: {}", name);

    let exists: Option<bool> = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM boxes WHERE LOWER(name) = LOWER($1))")
        .bind(name)
        .fetch_one(pool)
        .await?;

    Ok(exists.unwrap_or(false))
}

/// Fetch a box by id regardless of its active flag
pub async fn find_box(pool: &PgPool, id: i32) -> Result<Option<MysteryBox>, sqlx::Error> {
    sqlx::query_as::<_, MysteryBox>(&format!("SELECT {} FROM boxes WHERE id = $1", BOX_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Insert an active box straight into the table for database-backed tests
#[cfg(test)]
pub(crate) async fn insert_test_box(pool: &PgPool, name: &str, price: rust_decimal::Decimal, stock: i32) -> i32 {
    sqlx::query_scalar("INSERT INTO boxes (name, category, price, stock) VALUES ($1, 'birthday', $2, $3) RETURNING id")
        .bind(name)
        .bind(price)
        .bind(stock)
        .fetch_one(pool)
        .await
        .unwrap()
}
