//! API errors and their HTTP mapping
//!
//! Every handler returns `Result<_, ApiError>`. The response body is always
//! `{"error": {"code", "message"}}`; workflow rule violations keep the machine
//! code of their [`WorkflowError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::workflow::WorkflowError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Database failure: {0}")]
    Database(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorPayload<'a>,
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    code: &'a str,
    message: String,
}

impl ApiError {
    /// Stable code clients can branch on
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Invalid(_) => "VALIDATION_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Workflow(e) => e.code(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Workflow(e) => match e {
                WorkflowError::Validation(_)
                | WorkflowError::ReasonRequired
                | WorkflowError::EvidenceRequired
                | WorkflowError::EvidenceLimitExceeded { .. }
                | WorkflowError::MissingTrackingInfo => StatusCode::BAD_REQUEST,
                WorkflowError::IllegalTransition { .. }
                | WorkflowError::AlreadyDecided(_)
                | WorkflowError::ConcurrentModification { .. } => StatusCode::CONFLICT,
                WorkflowError::NotEligible(_)
                | WorkflowError::NoZoneFound
                | WorkflowError::NoRateApplicable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code, error = %message, "Request failed");
        } else {
            tracing::debug!(code, status = status.as_u16(), error = %message, "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorPayload { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return ApiError::NotFound("no matching record".to_string());
        }
        ApiError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Invalid(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("malformed JSON: {}", err))
    }
}
