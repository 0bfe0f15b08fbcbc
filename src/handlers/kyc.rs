use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::kyc::{KycDecisionRequest, KycRecord, KycService, SubmitKycRequest};
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::ApiResponse;

pub async fn submit_kyc(
    State(service): State<Arc<KycService>>,
    user: AuthenticatedUser,
    Json(request): Json<SubmitKycRequest>,
) -> Result<(StatusCode, Json<ApiResponse<KycRecord>>), ApiError> {
    let record = service.submit(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

pub async fn get_kyc(
    State(service): State<Arc<KycService>>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<KycRecord>>, ApiError> {
    let record = service.get(user_id, &user).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn decide_kyc(
    State(service): State<Arc<KycService>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(decision): Json<KycDecisionRequest>,
) -> Result<Json<ApiResponse<KycRecord>>, ApiError> {
    let record = service.decide(user_id, decision, &admin).await?;
    Ok(Json(ApiResponse::success(record)))
}
