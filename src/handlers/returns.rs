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
use crate::returns::{
    DecideReturnRequest, ListReturnsQuery, ReturnRequest, ReturnService, SubmitReturnRequest,
};

pub async fn submit_return(
    State(service): State<Arc<ReturnService>>,
    user: AuthenticatedUser,
    Json(request): Json<SubmitReturnRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReturnRequest>>), ApiError> {
    let created = service.submit(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn list_returns(
    State(service): State<Arc<ReturnService>>,
    user: AuthenticatedUser,
    Query(query): Query<ListReturnsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<ReturnRequest>>>, ApiError> {
    let requests = service.list(query, &user).await?;
    Ok(Json(ApiResponse::success(requests)))
}

pub async fn get_return(
    State(service): State<Arc<ReturnService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReturnRequest>>, ApiError> {
    let request = service.get(id, &user).await?;
    Ok(Json(ApiResponse::success(request)))
}

pub async fn decide_return(
    State(service): State<Arc<ReturnService>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(decision): Json<DecideReturnRequest>,
) -> Result<Json<ApiResponse<ReturnRequest>>, ApiError> {
    let request = service.decide(id, decision, &admin).await?;
    Ok(Json(ApiResponse::success(request)))
}
