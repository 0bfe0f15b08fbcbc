//! Return request route definitions

use axum::{routing::get, Router};

use crate::handlers::*;
use crate::state::AppState;

pub fn return_routes() -> Router<AppState> {
    Router::new()
        .route("/api/returns", get(list_returns).post(submit_return))
        .route("/api/returns/:id", get(get_return).patch(decide_return))
}
