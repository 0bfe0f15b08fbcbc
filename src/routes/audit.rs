//! Audit trail route definitions

use axum::{routing::get, Router};

use crate::handlers::get_audit_trail;
use crate::state::AppState;

pub fn audit_routes() -> Router<AppState> {
    Router::new().route("/api/audit/:entity_type/:entity_id", get(get_audit_trail))
}
