use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AdminUser;
use crate::models::ApiResponse;
use crate::shipping::{Resolution, ResolveRequest, ShippingService, ShippingZone, ZoneRequest};

pub async fn resolve_shipping(
    State(service): State<Arc<ShippingService>>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ApiResponse<Resolution>>, ApiError> {
    let resolution = service.resolve(request).await?;
    Ok(Json(ApiResponse::success(resolution)))
}

pub async fn list_zones(
    State(service): State<Arc<ShippingService>>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<ShippingZone>>>, ApiError> {
    let zones = service.list_zones().await?;
    Ok(Json(ApiResponse::success(zones)))
}

pub async fn create_zone(
    State(service): State<Arc<ShippingService>>,
    AdminUser(admin): AdminUser,
    Json(request): Json<ZoneRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShippingZone>>), ApiError> {
    let zone = service.create_zone(request).await?;
    tracing::info!(admin_id = %admin.user_id, zone_id = %zone.id, "Zone created by admin");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(zone))))
}

pub async fn get_zone(
    State(service): State<Arc<ShippingService>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ShippingZone>>, ApiError> {
    let zone = service.get_zone(id).await?;
    Ok(Json(ApiResponse::success(zone)))
}

pub async fn update_zone(
    State(service): State<Arc<ShippingService>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ZoneRequest>,
) -> Result<Json<ApiResponse<ShippingZone>>, ApiError> {
    let zone = service.update_zone(id, request).await?;
    Ok(Json(ApiResponse::success(zone)))
}

pub async fn delete_zone(
    State(service): State<Arc<ShippingService>>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service.delete_zone(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
