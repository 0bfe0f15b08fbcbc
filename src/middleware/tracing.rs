//! Request tracing middleware

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

static REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Log each request with its timing and tag it with an `x-request-id`.
/// A request id supplied by the proxy is kept.
pub async fn request_tracing(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID.clone(), value);
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Request started");

    let mut response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), duration_ms, "Request failed");
    } else if status.is_client_error() {
        tracing::warn!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), duration_ms, "Request rejected");
    } else {
        tracing::info!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), duration_ms, "Request completed");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID.clone(), value);
    }
    response
}
