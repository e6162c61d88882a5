use sqlx::PgPool;

use crate::wishlist::WishlistItem;

/// Repository for saved boxes
#[derive(Clone)]
pub struct WishlistRepository {
    pool: PgPool,
}

impl WishlistRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recently saved first
    pub async fn list(&self, user_id: i32) -> Result<Vec<WishlistItem>, sqlx::Error> {
        sqlx::query_as::<_, WishlistItem>(
            r#"
            SELECT w.box_id, b.name, b.category, b.price, b.image_url,
                   b.stock > 0 AS in_stock, b.is_active, w.added_at
            FROM wishlist_items w
            JOIN boxes b ON b.id = w.box_id
            WHERE w.user_id = $1
            ORDER BY w.added_at DESC, w.box_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Save a box; false when it was already saved
    pub async fn add(&self, user_id: i32, box_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO wishlist_items (user_id, box_id) VALUES ($1, $2) ON CONFLICT (user_id, box_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(box_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove(&self, user_id: i32, box_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND box_id = $2")
            .bind(user_id)
            .bind(box_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::insert_test_box;
    use rust_decimal_macros::dec;

    #[sqlx::test(migrations = "./migrations")]
    async fn test_saving_twice_keeps_one_entry(pool: PgPool) {
        let box_id = insert_test_box(&pool, "Eid Sweets", dec!(650), 0).await;
        let wishlist = WishlistRepository::new(pool);

        assert!(wishlist.add(7, box_id).await.unwrap());
        assert!(!wishlist.add(7, box_id).await.unwrap());

        let items = wishlist.list(7).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price, dec!(650));
        assert!(!items[0].in_stock);

        assert!(wishlist.remove(7, box_id).await.unwrap());
        assert!(!wishlist.remove(7, box_id).await.unwrap());
        assert!(wishlist.list(7).await.unwrap().is_empty());
    }
}
