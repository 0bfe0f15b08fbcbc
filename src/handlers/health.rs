use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use sqlx::PgPool;

use crate::db;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    database: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u128>,
    version: &'static str,
}

/// Liveness plus a database round trip; 503 when the database is unreachable
pub async fn health_check(State(pool): State<PgPool>) -> (StatusCode, Json<HealthResponse>) {
    let (status, database, latency_ms, code) = match db::check_health(&pool).await {
        Ok(elapsed) => (
            "healthy",
            "connected".to_string(),
            Some(elapsed.as_millis()),
            StatusCode::OK,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            ("unhealthy", e.to_string(), None, StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            latency_ms,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
