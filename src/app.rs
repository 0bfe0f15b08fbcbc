//! HTTP application assembly

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::handlers::health_check;
use crate::middleware;
use crate::routes;
use crate::state::AppState;
use crate::websocket;

/// Every route with the middleware stack applied
pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::ws_handler))
        .merge(routes::shipping_routes())
        .merge(routes::order_routes())
        .merge(routes::return_routes())
        .merge(routes::support_routes())
        .merge(routes::review_routes())
        .merge(routes::kyc_routes())
        .merge(routes::audit_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::security_headers));

    let router = if config.environment.is_production() {
        router.layer(axum::middleware::from_fn(middleware::hsts_header))
    } else {
        router
    };

    router
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(configure_cors(config))
}

fn configure_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        if config.environment.is_production() {
            tracing::warn!("CORS_ALLOWED_ORIGINS not set in production; cross-origin requests are refused");
            return CorsLayer::new();
        }
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

