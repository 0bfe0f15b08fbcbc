//! KYC route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::*;
use crate::state::AppState;

pub fn kyc_routes() -> Router<AppState> {
    Router::new()
        .route("/api/kyc", post(submit_kyc))
        .route("/api/kyc/:user_id", get(get_kyc))
        .route("/api/kyc/:user_id/decision", post(decide_kyc))
}
