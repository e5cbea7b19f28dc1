//! Downstream identity extractor
//!
//! Services behind the gateway read the subject from the headers the gateway
//! wrote. No verification happens here.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use crate::api::response::error_response;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Caller identity as asserted by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Missing identity header
#[derive(Debug)]
pub struct MissingIdentity;

impl IntoResponse for MissingIdentity {
    fn into_response(self) -> Response {
        error_response(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Authentication required")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for TrustedUser
where
    S: Send + Sync,
{
    type Rejection = MissingIdentity;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER).ok_or(MissingIdentity)?;
        Ok(Self {
            user_id,
            email: header(USER_EMAIL_HEADER),
        })
    }
}
