//! 网关路由定义

use axum::{
    middleware::from_fn_with_state,
    routing::{any, get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use super::client::TokenValidator;
use super::config::GatewayConfig;
use super::middleware::{optional_auth, require_auth, GateState};
use super::proxy::{forward, Upstream};

/// Upstream services behind the gateway
#[derive(Clone)]
pub struct Upstreams {
    pub auth: Upstream,
    pub users: Upstream,
    pub posts: Upstream,
    pub notifications: Upstream,
}

impl Upstreams {
    pub fn from_config(config: &GatewayConfig) -> anyhow::Result<Self> {
        let timeout = config.upstream_timeout;
        Ok(Self {
            auth: Upstream::new("auth-service", &config.auth_service_url, timeout)?,
            users: Upstream::new("user-service", &config.user_service_url, timeout)?,
            posts: Upstream::new("post-service", &config.post_service_url, timeout)?,
            notifications: Upstream::new("notification-service", &config.notification_service_url, timeout)?,
        })
    }
}

/// Routes under `/api/v1/{prefix}` and `/api/v1/{prefix}/*`
fn collection(prefix: &str, upstream: Upstream) -> Router {
    Router::new()
        .route(&format!("/api/v1/{}", prefix), any(forward))
        .route(&format!("/api/v1/{}/*rest", prefix), any(forward))
        .with_state(upstream)
}

/// 创建网关路由
pub fn create_gateway_routes(upstreams: Upstreams, validator: Arc<dyn TokenValidator>) -> Router {
    let gate = GateState::new(validator);

    // Login flow: no session yet
    let auth_public = Router::new()
        .route("/api/v1/auth/google", get(forward))
        .route("/api/v1/auth/google/callback", get(forward))
        .route("/api/v1/auth/exchange", post(forward))
        .route("/api/v1/auth/refresh", post(forward))
        .with_state(upstreams.auth.clone());

    let auth_protected = Router::new()
        .route("/api/v1/auth/logout", post(forward))
        .route("/api/v1/auth/validate", get(forward))
        .with_state(upstreams.auth)
        .route_layer(from_fn_with_state(gate.clone(), require_auth));

    let public = collection("public", upstreams.users.clone())
        .route_layer(from_fn_with_state(gate.clone(), optional_auth));

    let protected = collection("users", upstreams.users)
        .merge(collection("posts", upstreams.posts))
        .merge(collection("notifications", upstreams.notifications))
        .route_layer(from_fn_with_state(gate, require_auth));

    Router::new()
        .route("/health", get(health))
        .merge(auth_public)
        .merge(auth_protected)
        .merge(public)
        .merge(protected)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "service": "api-gateway",
        "status": "healthy",
    }))
}
