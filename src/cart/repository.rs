use sqlx::{PgConnection, PgPool};

use crate::cart::{CartError, CartLine, MAX_LINE_QUANTITY};

const CART_LINES_QUERY: &str = r#"
    SELECT c.box_id, b.name, b.price AS unit_price, c.quantity, c.personalization,
           b.stock, b.is_active, c.added_at
    FROM cart_items c
    JOIN boxes b ON b.id = c.box_id
    WHERE c.user_id = $1
    ORDER BY c.added_at, c.box_id
"#;

/// Repository for shopping cart lines
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn lines(&self, user_id: i32) -> Result<Vec<CartLine>, CartError> {
        let lines = sqlx::query_as::<_, CartLine>(CART_LINES_QUERY)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(lines)
    }

    pub async fn box_is_active(&self, box_id: i32) -> Result<bool, CartError> {
        let exists: Option<bool> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM boxes WHERE id = $1 AND is_active = TRUE)")
                .bind(box_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.unwrap_or(false))
    }

    pub async fn line_count(&self, user_id: i32) -> Result<i64, CartError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn contains(&self, user_id: i32, box_id: i32) -> Result<bool, CartError> {
        let exists: Option<bool> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cart_items WHERE user_id = $1 AND box_id = $2)")
                .bind(user_id)
                .bind(box_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.unwrap_or(false))
    }

    /// Add units to a line, creating it if needed
    ///
    /// Returns false, writing nothing, when the merged quantity would pass the per-line cap.
    pub async fn add(
        &self,
        user_id: i32,
        box_id: i32,
        quantity: i32,
        personalization: Option<&str>,
    ) -> Result<bool, CartError> {
        let added: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO cart_items (user_id, box_id, quantity, personalization)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, box_id) DO UPDATE
            SET quantity = cart_items.quantity + EXCLUDED.quantity,
                personalization = COALESCE(EXCLUDED.personalization, cart_items.personalization),
                updated_at = NOW()
            WHERE cart_items.quantity + EXCLUDED.quantity <= $5
            RETURNING box_id
            "#,
        )
        .bind(user_id)
        .bind(box_id)
        .bind(quantity)
        .bind(personalization)
        .bind(MAX_LINE_QUANTITY)
        .fetch_optional(&self.pool)
        .await?;

        Ok(added.is_some())
    }

    /// Replace a line's quantity; false when the box is not in the cart
    pub async fn set_quantity(
        &self,
        user_id: i32,
        box_id: i32,
        quantity: i32,
        personalization: Option<&str>,
    ) -> Result<bool, CartError> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = $3,
                personalization = COALESCE($4, personalization),
                updated_at = NOW()
            WHERE user_id = $1 AND box_id = $2
            "#,
        )
        .bind(user_id)
        .bind(box_id)
        .bind(quantity)
        .bind(personalization)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove(&self, user_id: i32, box_id: i32) -> Result<bool, CartError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND box_id = $2")
            .bind(user_id)
            .bind(box_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn clear(&self, user_id: i32) -> Result<u64, CartError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Drop ordered boxes from the cart on the checkout connection
    pub async fn remove_boxes(conn: &mut PgConnection, user_id: i32, box_ids: &[i32]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND box_id = ANY($2)")
            .bind(user_id)
            .bind(box_ids)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}
