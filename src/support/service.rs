use sqlx::PgPool;
use validator::Validate;

use crate::notifications::{NewNotification, NotificationKind, NotificationRepository};
use crate::support::{
    CreateTicketRequest, SupportError, SupportRepository, SupportTicket, TicketQuery, TicketStatus,
    UpdateTicketRequest,
};

/// Status a ticket ends up in after an admin update
///
/// A response without a status keeps the current one. Closed tickets take no updates.
pub fn plan_ticket_update(
    current: TicketStatus,
    requested: Option<TicketStatus>,
    has_response: bool,
) -> Result<TicketStatus, SupportError> {
    if requested.is_none() && !has_response {
        return Err(SupportError::ValidationError(
            "Provide a status or a response".to_string(),
        ));
    }
    if current == TicketStatus::Closed {
        return Err(SupportError::Closed);
    }
    match requested {
        Some(next) if next != current => {
            if current.can_transition_to(next) {
                Ok(next)
            } else {
                Err(SupportError::InvalidTransition { from: current, to: next })
            }
        }
        _ => Ok(current),
    }
}

/// Service for customer support tickets
#[derive(Clone)]
pub struct SupportService {
    repository: SupportRepository,
    notifications: NotificationRepository,
}

impl SupportService {
    pub fn new(pool: PgPool, notifications: NotificationRepository) -> Self {
        Self {
            repository: SupportRepository::new(pool),
            notifications,
        }
    }

    pub async fn create(&self, user_id: i32, request: CreateTicketRequest) -> Result<SupportTicket, SupportError> {
        request
            .validate()
            .map_err(|e| SupportError::ValidationError(e.to_string()))?;

        if let Some(order_id) = request.order_id {
            if !self.repository.order_belongs_to(order_id, user_id).await? {
                return Err(SupportError::OrderNotFound);
            }
        }

        let ticket = self
            .repository
            .insert(user_id, request.order_id, request.subject.trim(), &request.message)
            .await?;

        tracing::info!("User {} opened support ticket {}", user_id, ticket.id);
        Ok(ticket)
    }

    pub async fn list_mine(&self, user_id: i32) -> Result<Vec<SupportTicket>, SupportError> {
        self.repository.list_for_user(user_id).await
    }

    /// A ticket for its owner; other users see NotFound
    pub async fn get_mine(&self, user_id: i32, id: i32) -> Result<SupportTicket, SupportError> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(|ticket| ticket.user_id == user_id)
            .ok_or(SupportError::NotFound)
    }

    /// Customers may close their own ticket
    pub async fn close_mine(&self, user_id: i32, id: i32) -> Result<SupportTicket, SupportError> {
        let ticket = self.get_mine(user_id, id).await?;
        let next = plan_ticket_update(ticket.status, Some(TicketStatus::Closed), false)?;

        self.repository
            .update(id, ticket.status, next, None, None)
            .await?
            .ok_or(SupportError::InvalidTransition {
                from: ticket.status,
                to: next,
            })
    }

    pub async fn admin_list(&self, query: &TicketQuery) -> Result<Vec<SupportTicket>, SupportError> {
        self.repository.list_all(query.status).await
    }

    pub async fn admin_update(
        &self,
        id: i32,
        admin_id: i32,
        request: UpdateTicketRequest,
    ) -> Result<SupportTicket, SupportError> {
        request
            .validate()
            .map_err(|e| SupportError::ValidationError(e.to_string()))?;

        let ticket = self.repository.find_by_id(id).await?.ok_or(SupportError::NotFound)?;
        let next = plan_ticket_update(ticket.status, request.status, request.response.is_some())?;

        // The customer may have closed it since the read
        let updated = self
            .repository
            .update(id, ticket.status, next, request.response.as_deref(), Some(admin_id))
            .await?
            .ok_or(SupportError::InvalidTransition {
                from: ticket.status,
                to: next,
            })?;

        tracing::info!("Admin {} updated ticket {} ({} -> {})", admin_id, id, ticket.status, updated.status);

        self.notifications
            .notify(NewNotification {
                user_id: updated.user_id,
                kind: NotificationKind::SupportUpdate,
                title: format!("Support ticket #{} is {}", updated.id, updated.status),
                message: request
                    .response
                    .unwrap_or_else(|| format!("Your ticket \"{}\" was updated.", updated.subject)),
            })
            .await;

        Ok(updated)
    }
}


#[cfg(test)]
mod db_tests {
    use super::*;

    fn service(pool: &PgPool) -> SupportService {
        SupportService::new(pool.clone(), NotificationRepository::new(pool.clone()))
    }

    fn ticket_request() -> CreateTicketRequest {
        CreateTicketRequest {
            subject: "Damaged box".to_string(),
            message: "The lid was crushed on arrival.".to_string(),
            order_id: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_ticket_lifecycle(pool: PgPool) {
        let support = service(&pool);
        let ticket = support.create(7, ticket_request()).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);

        let answered = support
            .admin_update(
                ticket.id,
                1,
                UpdateTicketRequest {
                    status: Some(TicketStatus::Resolved),
                    response: Some("A replacement is on its way.".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(answered.status, TicketStatus::Resolved);
        assert_eq!(answered.responded_by, Some(1));

        let notes = NotificationRepository::new(pool.clone()).list_for_user(7).await.unwrap();
        assert_eq!(notes[0].kind, NotificationKind::SupportUpdate);

        let closed = support.close_mine(7, ticket.id).await.unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert!(matches!(support.close_mine(7, ticket.id).await, Err(SupportError::Closed)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_tickets_are_private(pool: PgPool) {
        let support = service(&pool);
        let ticket = support.create(7, ticket_request()).await.unwrap();

        assert!(matches!(support.get_mine(8, ticket.id).await, Err(SupportError::NotFound)));
        assert!(support.list_mine(8).await.unwrap().is_empty());

        let foreign_order = CreateTicketRequest {
            order_id: Some(uuid::Uuid::new_v4()),
            ..ticket_request()
        };
        assert!(matches!(
            support.create(7, foreign_order).await,
            Err(SupportError::OrderNotFound)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_admin_queue_filters_by_status(pool: PgPool) {
        let support = service(&pool);
        let first = support.create(7, ticket_request()).await.unwrap();
        support.create(8, ticket_request()).await.unwrap();
        support.close_mine(7, first.id).await.unwrap();

        let open = support
            .admin_list(&TicketQuery {
                status: Some(TicketStatus::Open),
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].user_id, 8);
        assert_eq!(support.admin_list(&TicketQuery::default()).await.unwrap().len(), 2);
    }
}
