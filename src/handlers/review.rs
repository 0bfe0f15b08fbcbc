use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthenticatedUser, OptionalUser};
use crate::models::{ApiResponse, PaginatedResponse};
use crate::review::{CreateReviewRequest, ListReviewsQuery, ModerateReviewRequest, Review, ReviewService};

pub async fn create_review(
    State(service): State<Arc<ReviewService>>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>), ApiError> {
    let review = service.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(review))))
}

/// Anonymous callers and non-admins only see approved reviews
pub async fn list_reviews(
    State(service): State<Arc<ReviewService>>,
    OptionalUser(user): OptionalUser,
    Query(query): Query<ListReviewsQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Review>>>, ApiError> {
    let is_admin = user.as_ref().map_or(false, AuthenticatedUser::is_admin);
    let reviews = service.list(query, is_admin).await?;
    Ok(Json(ApiResponse::success(reviews)))
}

pub async fn moderate_review(
    State(service): State<Arc<ReviewService>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ModerateReviewRequest>,
) -> Result<Json<ApiResponse<Review>>, ApiError> {
    let review = service.moderate(id, request.status, &admin).await?;
    Ok(Json(ApiResponse::success(review)))
}

pub async fn delete_review(
    State(service): State<Arc<ReviewService>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    service.delete(id, &admin).await?;
    Ok(StatusCode::NO_CONTENT)
}
