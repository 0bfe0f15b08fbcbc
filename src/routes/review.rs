//! Review route definitions

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews", get(list_reviews).post(create_review))
        .route("/api/reviews/:id", put(moderate_review).delete(delete_review))
}
