use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Where a support ticket stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    /// open -> in_progress | resolved | closed, in_progress -> resolved | closed,
    /// resolved -> in_progress (reopened) | closed; closed is final
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Open, TicketStatus::InProgress)
                | (TicketStatus::Open, TicketStatus::Resolved)
                | (TicketStatus::Open, TicketStatus::Closed)
                | (TicketStatus::InProgress, TicketStatus::Resolved)
                | (TicketStatus::InProgress, TicketStatus::Closed)
                | (TicketStatus::Resolved, TicketStatus::InProgress)
                | (TicketStatus::Resolved, TicketStatus::Closed)
        )
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SupportTicket {
    pub id: i32,
    pub user_id: i32,
    pub order_id: Option<Uuid>,
    pub subject: String,
    pub message: String,
    pub status: TicketStatus,
    pub admin_response: Option<String>,
    pub responded_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for POST /api/user/support
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketRequest {
    #[validate(length(min = 3, max = 200, message = "Subject must be between 3 and 200 characters"))]
    pub subject: String,
    #[validate(length(min = 10, max = 5000, message = "Message must be between 10 and 5000 characters"))]
    pub message: String,
    /// Order the ticket is about, if any; must belong to the caller
    pub order_id: Option<Uuid>,
}

/// Request DTO for PUT /api/admin/support/{id}
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTicketRequest {
    pub status: Option<TicketStatus>,
    #[validate(length(min = 1, max = 5000, message = "Response must be between 1 and 5000 characters"))]
    pub response: Option<String>,
}

/// Query parameters for GET /api/admin/support
#[derive(Debug, Default, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(serde_json::to_string(&TicketStatus::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(
            serde_json::from_str::<TicketStatus>("\"resolved\"").unwrap(),
            TicketStatus::Resolved
        );
    }

    #[test]
    fn test_closed_is_final() {
        for next in TicketStatus::ALL {
            assert!(!TicketStatus::Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_resolved_can_reopen() {
        assert!(TicketStatus::Resolved.can_transition_to(TicketStatus::InProgress));
        assert!(!TicketStatus::Resolved.can_transition_to(TicketStatus::Open));
        assert!(!TicketStatus::InProgress.can_transition_to(TicketStatus::Open));
    }

    #[test]
    fn test_no_self_transitions() {
        for status in TicketStatus::ALL {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn test_create_request_lengths() {
        let request = CreateTicketRequest {
            subject: "Hi".to_string(),
            message: "My box arrived crushed".to_string(),
            order_id: None,
        };
        assert!(request.validate().is_err());

        let request = CreateTicketRequest {
            subject: "Damaged box".to_string(),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
