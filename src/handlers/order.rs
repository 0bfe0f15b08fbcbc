use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{ApiResponse, PaginatedResponse};
use crate::order::{CreateOrderRequest, ListOrdersQuery, Order, OrderService, UpdateOrderStatusRequest};

pub async fn place_order(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), ApiError> {
    let order = service.place_order(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

pub async fn get_order(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = service.get_order(id, &user).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_orders(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Order>>>, ApiError> {
    let orders = service.list_orders(query, &user).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn update_order_status(
    State(service): State<Arc<OrderService>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = service.update_status(id, request, &user).await?;
    Ok(Json(ApiResponse::success(order)))
}
