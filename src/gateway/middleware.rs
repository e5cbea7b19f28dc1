//! 网关认证中间件
//!
//! Two gates over the same validation path:
//! - `require_auth`: aborts with 401 unless the bearer token validates
//! - `optional_auth`: attaches the subject when it can, otherwise passes through
//!
//! Both strip client-supplied identity headers first, so downstream services
//! only ever see identity headers written here.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::client::{GatewayError, TokenValidator};
use super::trusted::{USER_EMAIL_HEADER, USER_ID_HEADER};
use crate::api::response::error_response;
use crate::auth::types::ValidatedSubject;

/// Gate state
#[derive(Clone)]
pub struct GateState {
    pub validator: Arc<dyn TokenValidator>,
}

impl GateState {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self { validator }
    }
}

/// Subject attached to a request that passed a gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
}

/// Why a request failed the mandatory gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    MissingToken,
    InvalidFormat,
    InvalidToken,
    Unavailable,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            Self::MissingToken => error_response(
                StatusCode::UNAUTHORIZED,
                "MISSING_TOKEN",
                "Authorization token is required",
            ),
            Self::InvalidFormat => error_response(
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN_FORMAT",
                "Authorization header must be 'Bearer <token>'",
            ),
            Self::InvalidToken => error_response(
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "Invalid or expired token",
            ),
            Self::Unavailable => error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Authentication service temporarily unavailable",
            ),
        }
    }
}

/// Extract the bearer token from the Authorization header
fn bearer(headers: &HeaderMap) -> Result<&str, GateRejection> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(GateRejection::MissingToken)?;
    let value = value.to_str().map_err(|_| GateRejection::InvalidFormat)?;
    if value.trim().is_empty() {
        return Err(GateRejection::MissingToken);
    }

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(GateRejection::InvalidFormat),
    }
}

fn strip_identity_headers(headers: &mut HeaderMap) {
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_EMAIL_HEADER);
}

fn attach_identity(req: &mut Request, subject: ValidatedSubject) -> Result<(), GateRejection> {
    let user_id = HeaderValue::from_str(&subject.user_id).map_err(|_| GateRejection::InvalidToken)?;
    let headers = req.headers_mut();
    headers.insert(USER_ID_HEADER, user_id);
    if let Ok(email) = HeaderValue::from_str(&subject.email) {
        if !subject.email.is_empty() {
            headers.insert(USER_EMAIL_HEADER, email);
        }
    }
    req.extensions_mut().insert(AuthenticatedUser {
        user_id: subject.user_id,
        email: subject.email,
    });
    Ok(())
}

async fn authenticate(gate: &GateState, req: &mut Request) -> Result<(), GateRejection> {
    let token = bearer(req.headers())?.to_string();
    let subject = gate.validator.validate(&token).await.map_err(|e| match e {
        GatewayError::Rejected(reason) => {
            debug!("gateway rejected token: {}", reason);
            GateRejection::InvalidToken
        }
        GatewayError::Unavailable(reason) => {
            warn!("token validation unavailable: {}", reason);
            GateRejection::Unavailable
        }
    })?;
    attach_identity(req, subject)
}

/// Mandatory gate
pub async fn require_auth(State(gate): State<GateState>, mut req: Request, next: Next) -> Response {
    strip_identity_headers(req.headers_mut());

    match authenticate(&gate, &mut req).await {
        Ok(()) => next.run(req).await,
        Err(rejection) => rejection.into_response(),
    }
}

/// Optional gate
pub async fn optional_auth(State(gate): State<GateState>, mut req: Request, next: Next) -> Response {
    strip_identity_headers(req.headers_mut());

    if req.headers().contains_key(header::AUTHORIZATION) {
        if let Err(rejection) = authenticate(&gate, &mut req).await {
            debug!("optional gate continuing anonymously: {:?}", rejection);
            strip_identity_headers(req.headers_mut());
        }
    }
    next.run(req).await
}
