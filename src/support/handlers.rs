// HTTP handlers for support tickets

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::support::{CreateTicketRequest, SupportError, SupportTicket, TicketQuery, UpdateTicketRequest};
use crate::AppState;

/// POST /api/user/support
pub async fn create_ticket_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<SupportTicket>), SupportError> {
    let ticket = state.support_service.create(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /api/user/support
pub async fn list_my_tickets_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<SupportTicket>>, SupportError> {
    let tickets = state.support_service.list_mine(user.user_id).await?;
    Ok(Json(tickets))
}

/// GET /api/user/support/{id}
pub async fn get_my_ticket_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<Json<SupportTicket>, SupportError> {
    let ticket = state.support_service.get_mine(user.user_id, id).await?;
    Ok(Json(ticket))
}

/// PUT /api/user/support/{id}/close
pub async fn close_my_ticket_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<Json<SupportTicket>, SupportError> {
    let ticket = state.support_service.close_mine(user.user_id, id).await?;
    Ok(Json(ticket))
}

/// Support queue, optionally filtered by status
/// GET /api/admin/support
pub async fn admin_list_tickets_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<SupportTicket>>, SupportError> {
    let tickets = state.support_service.admin_list(&query).await?;
    Ok(Json(tickets))
}

/// Respond to and/or move a ticket
/// PUT /api/admin/support/{id}
pub async fn admin_update_ticket_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateTicketRequest>,
) -> Result<Json<SupportTicket>, SupportError> {
    let ticket = state.support_service.admin_update(id, admin.user_id, request).await?;
    Ok(Json(ticket))
}
