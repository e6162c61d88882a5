use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What an in-app notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderPlaced,
    OrderStatus,
    OrderTracking,
    OrderRefunded,
    SupportUpdate,
}

/// In-app notification shown to a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i32,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification content before it is stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: i32,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}
