//! Shipping route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn shipping_routes() -> Router<AppState> {
    Router::new()
        .route("/api/shipping/resolve", post(resolve_shipping))
        .route("/api/shipping/zones", get(list_zones).post(create_zone))
        .route(
            "/api/shipping/zones/:id",
            get(get_zone).put(update_zone).delete(delete_zone),
        )
}
