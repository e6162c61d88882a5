use sqlx::PgPool;

use crate::notifications::{NewNotification, Notification};

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, is_read, created_at";
const MAX_LISTED: i64 = 100;

/// Repository for in-app notifications
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: &NewNotification) -> Result<Notification, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (user_id, kind, title, message)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(new.user_id)
        .bind(new.kind)
        .bind(&new.title)
        .bind(&new.message)
        .fetch_one(&self.pool)
        .await
    }

    /// Store a notification; a failure is logged and swallowed
    pub async fn notify(&self, new: NewNotification) {
        if let Err(e) = self.create(&new).await {
            tracing::warn!("Failed to store notification for user {}: {}", new.user_id, e);
        }
    }

    /// Latest notifications first
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
            NOTIFICATION_COLUMNS
        ))
        .bind(user_id)
        .bind(MAX_LISTED)
        .fetch_all(&self.pool)
        .await
    }

    /// Mark one of the user's notifications as read
    pub async fn mark_read(&self, user_id: i32, id: i64) -> Result<Option<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING {}",
            NOTIFICATION_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
