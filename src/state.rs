//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::kyc::KycService;
use crate::order::OrderService;
use crate::returns::ReturnService;
use crate::review::ReviewService;
use crate::shipping::ShippingService;
use crate::support::SupportService;
use crate::websocket::WsState;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: Arc<AuthService>,
    pub shipping_service: Arc<ShippingService>,
    pub order_service: Arc<OrderService>,
    pub return_service: Arc<ReturnService>,
    pub support_service: Arc<SupportService>,
    pub review_service: Arc<ReviewService>,
    pub kyc_service: Arc<KycService>,
    pub ws_state: WsState,
}

impl AppState {
    /// Wire every service onto one pool and one event feed
    pub fn new(db_pool: PgPool, auth_service: AuthService) -> Self {
        let ws_state = WsState::new();
        Self {
            auth_service: Arc::new(auth_service),
            shipping_service: Arc::new(ShippingService::new(db_pool.clone())),
            order_service: Arc::new(OrderService::new(db_pool.clone(), ws_state.clone())),
            return_service: Arc::new(ReturnService::new(db_pool.clone(), ws_state.clone())),
            support_service: Arc::new(SupportService::new(db_pool.clone(), ws_state.clone())),
            review_service: Arc::new(ReviewService::new(db_pool.clone(), ws_state.clone())),
            kyc_service: Arc::new(KycService::new(db_pool.clone(), ws_state.clone())),
            ws_state,
            db_pool,
        }
    }
}

impl FromRef<AppState> for WsState {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ws_state.clone()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<ShippingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.shipping_service.clone()
    }
}

impl FromRef<AppState> for Arc<OrderService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.order_service.clone()
    }
}

impl FromRef<AppState> for Arc<ReturnService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.return_service.clone()
    }
}

impl FromRef<AppState> for Arc<SupportService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.support_service.clone()
    }
}

impl FromRef<AppState> for Arc<ReviewService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.review_service.clone()
    }
}

impl FromRef<AppState> for Arc<KycService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.kyc_service.clone()
    }
}
