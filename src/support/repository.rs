use sqlx::PgPool;
use uuid::Uuid;

use crate::support::{SupportError, SupportTicket, TicketStatus};

const TICKET_COLUMNS: &str =
    "id, user_id, order_id, subject, message, status, admin_response, responded_by, created_at, updated_at";
const MAX_LISTED: i64 = 200;

/// Repository for support tickets
#[derive(Clone)]
pub struct SupportRepository {
    pool: PgPool,
}

impl SupportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        user_id: i32,
        order_id: Option<Uuid>,
        subject: &str,
        message: &str,
    ) -> Result<SupportTicket, SupportError> {
        let ticket = sqlx::query_as::<_, SupportTicket>(&format!(
            r#"
            INSERT INTO support_tickets (user_id, order_id, subject, message, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(user_id)
        .bind(order_id)
        .bind(subject)
        .bind(message)
        .bind(TicketStatus::Open)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    pub async fn order_belongs_to(&self, order_id: Uuid, user_id: i32) -> Result<bool, SupportError> {
        let exists: Option<bool> =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = $1 AND user_id = $2)")
                .bind(order_id)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists.unwrap_or(false))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<SupportTicket>, SupportError> {
        let ticket = sqlx::query_as::<_, SupportTicket>(&format!(
            "SELECT {} FROM support_tickets WHERE id = $1",
            TICKET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<SupportTicket>, SupportError> {
        let tickets = sqlx::query_as::<_, SupportTicket>(&format!(
            "SELECT {} FROM support_tickets WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            TICKET_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Oldest first so the queue is worked in arrival order
    pub async fn list_all(&self, status: Option<TicketStatus>) -> Result<Vec<SupportTicket>, SupportError> {
        let tickets = sqlx::query_as::<_, SupportTicket>(&format!(
            r#"
            SELECT {} FROM support_tickets
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at, id
            LIMIT $2
            "#,
            TICKET_COLUMNS
        ))
        .bind(status)
        .bind(MAX_LISTED)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Apply a status and optional response if the ticket is still in `from`
    pub async fn update(
        &self,
        id: i32,
        from: TicketStatus,
        to: TicketStatus,
        response: Option<&str>,
        responded_by: Option<i32>,
    ) -> Result<Option<SupportTicket>, SupportError> {
        let ticket = sqlx::query_as::<_, SupportTicket>(&format!(
            r#"
            UPDATE support_tickets
            SET status = $3,
                admin_response = COALESCE($4, admin_response),
                responded_by = CASE WHEN $4::text IS NULL THEN responded_by ELSE $5 END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            TICKET_COLUMNS
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(response)
        .bind(responded_by)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }
}
