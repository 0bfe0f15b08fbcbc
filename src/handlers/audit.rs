use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::AdminUser;
use crate::models::ApiResponse;
use crate::workflow::{list_audit_trail, AuditLog};

const ENTITY_TYPES: [&str; 5] = ["order", "return", "ticket", "review", "kyc"];

/// Transition history of one entity, oldest first
pub async fn get_audit_trail(
    State(pool): State<PgPool>,
    _admin: AdminUser,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
) -> Result<Json<ApiResponse<Vec<AuditLog>>>, ApiError> {
    if !ENTITY_TYPES.contains(&entity_type.as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Unknown entity type '{}'",
            entity_type
        )));
    }
    let trail = list_audit_trail(&pool, &entity_type, entity_id).await?;
    Ok(Json(ApiResponse::success(trail)))
}
