//! Support ticket route definitions

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn support_routes() -> Router<AppState> {
    Router::new()
        .route("/api/support/tickets", get(list_tickets).post(create_ticket))
        .route("/api/support/tickets/:id", get(get_ticket))
        .route("/api/support/tickets/:id/replies", post(reply_to_ticket))
        .route("/api/support/tickets/:id/status", patch(change_ticket_status))
}
