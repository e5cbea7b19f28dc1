//! API请求处理器（轻量）

use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tracing::{debug, info, warn};

use super::{routes::AuthState, validators};
use crate::api::response::{respond, ApiResponse};
use crate::auth::{errors::AuthError, types::*};

/// Unwrap a JSON body, turning extractor rejections into `InvalidRequest`
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AuthError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| AuthError::InvalidRequest(rejection.body_text()))
}

/// from请求头提取Bearer token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// `GET /api/v1/auth/google`
pub async fn google_auth_url(State(state): State<AuthState>) -> Result<Response, AuthError> {
    let response = state.service.auth_url().await?;
    Ok(respond(
        StatusCode::OK,
        ApiResponse::ok("Google OAuth URL generated", response),
    ))
}

/// `GET /api/v1/auth/google/callback`
///
/// Always answers with a browser redirect to the frontend.
pub async fn google_callback(
    State(state): State<AuthState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let login_error = |reason: &str| {
        Redirect::temporary(&format!("{}/auth/login?error={}", state.frontend_url, reason))
    };

    if let Some(error) = query.error.as_deref() {
        warn!("provider reported callback error: {}", error);
        return login_error("google_oauth_error");
    }

    let (Some(oauth_state), Some(code)) = (
        query.state.as_deref().filter(|s| !s.is_empty()),
        query.code.as_deref().filter(|c| !c.is_empty()),
    ) else {
        return login_error("invalid_callback");
    };

    if validators::validate_code("code", code).is_err() {
        return login_error("invalid_code");
    }

    match state.service.handle_callback(oauth_state, code).await {
        Ok(auth_code) => Redirect::temporary(&format!(
            "{}/auth/callback?auth_code={}",
            state.frontend_url, auth_code
        )),
        Err(_) => login_error("invalid_code"),
    }
}

/// `POST /api/v1/auth/exchange`
pub async fn exchange(
    State(state): State<AuthState>,
    payload: Result<Json<ExchangeRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let req = body(payload)?;
    validators::validate_code("auth_code", &req.auth_code)?;

    let session = state.service.exchange_auth_code(req.auth_code.trim()).await?;
    Ok(respond(StatusCode::OK, ApiResponse::ok("Authentication successful", session)))
}

/// `POST /api/v1/auth/refresh`
pub async fn refresh(
    State(state): State<AuthState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let req = body(payload)?;
    validators::validate_token("refresh_token", &req.refresh_token)?;

    let session = state.service.refresh(req.refresh_token.trim()).await?;
    Ok(respond(StatusCode::OK, ApiResponse::ok("Token refreshed", session)))
}

/// `POST /api/v1/auth/logout`
///
/// Token comes from the body; a bearer header is accepted when the body omits it.
pub async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
    payload: Result<Json<LogoutRequest>, JsonRejection>,
) -> Result<Response, AuthError> {
    let token = match payload {
        Ok(Json(req)) if !req.access_token.trim().is_empty() => req.access_token,
        Ok(_) | Err(JsonRejection::MissingJsonContentType(_)) => bearer_token(&headers)
            .map(str::to_string)
            .ok_or_else(|| AuthError::InvalidRequest("access_token is required".to_string()))?,
        Err(rejection) => return Err(AuthError::InvalidRequest(rejection.body_text())),
    };
    validators::validate_token("access_token", &token)?;

    state.service.logout(token.trim()).await?;
    info!("API: logout completed");
    Ok(respond(StatusCode::OK, ApiResponse::empty("Logged out successfully")))
}

/// `GET /api/v1/auth/validate`
///
/// Token failures collapse into one response, a missing bearer header included;
/// the specific reason is only logged.
pub async fn validate(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let Some(token) = bearer_token(&headers) else {
        debug!("validation rejected: no bearer token");
        return Err(AuthError::InvalidOrExpiredToken);
    };

    match state.service.validate(token).await {
        Ok(subject) => Ok(respond(
            StatusCode::OK,
            ApiResponse::ok("Token is valid", ValidationResponse::from(subject)),
        )),
        Err(AuthError::ServiceUnavailable) => Err(AuthError::ServiceUnavailable),
        Err(e) => {
            debug!("validation rejected: {}", e.error_code());
            Err(AuthError::InvalidOrExpiredToken)
        }
    }
}

/// `GET /health`
pub async fn health(State(state): State<AuthState>) -> Response {
    let (status, health, store) = if state.service.store_healthy().await {
        (StatusCode::OK, "healthy", "up")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
    };
    (
        status,
        Json(json!({
            "service": "auth-service",
            "status": health,
            "store": store,
        })),
    )
        .into_response()
}
