use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::{ApiResponse, PaginatedResponse};
use crate::support::{
    ChangeTicketStatusRequest, CreateTicketRequest, ListTicketsQuery, ReplyRequest, SupportService,
    SupportTicket, TicketReply,
};

pub async fn create_ticket(
    State(service): State<Arc<SupportService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SupportTicket>>), ApiError> {
    let ticket = service.create_ticket(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(ticket))))
}

pub async fn list_tickets(
    State(service): State<Arc<SupportService>>,
    user: AuthenticatedUser,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<SupportTicket>>>, ApiError> {
    let tickets = service.list_tickets(query, &user).await?;
    Ok(Json(ApiResponse::success(tickets)))
}

pub async fn get_ticket(
    State(service): State<Arc<SupportService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SupportTicket>>, ApiError> {
    let ticket = service.get_ticket(id, &user).await?;
    Ok(Json(ApiResponse::success(ticket)))
}

pub async fn reply_to_ticket(
    State(service): State<Arc<SupportService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TicketReply>>), ApiError> {
    let reply = service.reply(id, &request.message, &user).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(reply))))
}

pub async fn change_ticket_status(
    State(service): State<Arc<SupportService>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeTicketStatusRequest>,
) -> Result<Json<ApiResponse<SupportTicket>>, ApiError> {
    let ticket = service.change_status(id, request, &admin).await?;
    Ok(Json(ApiResponse::success(ticket)))
}
