//! API路由定义

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use crate::auth::AuthService;

/// Shared handler state
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
    /// Without trailing slash
    pub frontend_url: Arc<str>,
}

/// 创建认证路由
pub fn create_auth_routes(service: Arc<AuthService>, frontend_url: &str) -> Router {
    let state = AuthState {
        service,
        frontend_url: Arc::from(frontend_url.trim_end_matches('/')),
    };

    let auth = Router::new()
        // OAuth
        .route("/auth/google", get(handlers::google_auth_url))
        .route("/auth/google/callback", get(handlers::google_callback))
        .route("/auth/exchange", post(handlers::exchange))
        // 会话管理
        .route("/auth/refresh", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/validate", get(handlers::validate));

    Router::new()
        .nest("/api/v1", auth)
        .route("/health", get(handlers::health))
        .with_state(state)
}
