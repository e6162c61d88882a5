use sqlx::{types::Json, PgConnection, PgPool};

use crate::addresses::{SaveAddressRequest, SavedAddress};

const ADDRESS_COLUMNS: &str = "id, user_id, label, address, is_default, created_at, updated_at";

/// Repository for the address book
///
/// Writes run on the caller's connection so default switching stays in one transaction.
#[derive(Clone)]
pub struct AddressRepository {
    pool: PgPool,
}

impl AddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Default first, then oldest first
    pub async fn list(&self, user_id: i32) -> Result<Vec<SavedAddress>, sqlx::Error> {
        sqlx::query_as::<_, SavedAddress>(&format!(
            "SELECT {} FROM user_addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at, id",
            ADDRESS_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count(conn: &mut PgConnection, user_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_addresses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn clear_default(conn: &mut PgConnection, user_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE user_addresses SET is_default = FALSE, updated_at = NOW() WHERE user_id = $1 AND is_default")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn insert(
        conn: &mut PgConnection,
        user_id: i32,
        request: &SaveAddressRequest,
        is_default: bool,
    ) -> Result<SavedAddress, sqlx::Error> {
        sqlx::query_as::<_, SavedAddress>(&format!(
            r#"
            INSERT INTO user_addresses (user_id, label, address, is_default)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        ))
        .bind(user_id)
        .bind(&request.label)
        .bind(Json(&request.address))
        .bind(is_default)
        .fetch_one(&mut *conn)
        .await
    }

    /// Replace label and address; `make_default` only ever sets the flag
    pub async fn update(
        conn: &mut PgConnection,
        id: i32,
        user_id: i32,
        request: &SaveAddressRequest,
        make_default: bool,
    ) -> Result<Option<SavedAddress>, sqlx::Error> {
        sqlx::query_as::<_, SavedAddress>(&format!(
            r#"
            UPDATE user_addresses
            SET label = $3, address = $4, is_default = is_default OR $5, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(&request.label)
        .bind(Json(&request.address))
        .bind(make_default)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Delete an address; returns whether it was the default, `None` when absent
    pub async fn delete(conn: &mut PgConnection, id: i32, user_id: i32) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar("DELETE FROM user_addresses WHERE id = $1 AND user_id = $2 RETURNING is_default")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Make the newest remaining address the default
    pub async fn promote_latest(conn: &mut PgConnection, user_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE user_addresses
            SET is_default = TRUE, updated_at = NOW()
            WHERE id = (
                SELECT id FROM user_addresses
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT 1
            )
            "#,
        )
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
