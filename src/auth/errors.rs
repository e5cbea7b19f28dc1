//! 认证error类型定义
//!
//! Client-visible taxonomy. Collaborator errors (codec, provider, store) are
//! logged where they occur and collapsed into one of these variants.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::response::error_response;

/// 认证error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad, expired or replayed authorization code or CSRF state
    #[error("Invalid authorization code")]
    InvalidAuthorizationCode,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    /// Cryptographically valid but no server-side record
    #[error("Token not found")]
    TokenNotFound,

    #[error("Token has been revoked")]
    TokenBlacklisted,

    #[error("Invalid token type")]
    InvalidTokenType,

    #[error("Failed to generate tokens")]
    TokenGenerationFailed,

    #[error("Failed to store tokens")]
    TokenStorageFailed,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AuthError {
    /// fetchHTTP状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAuthorizationCode
            | Self::InvalidOrExpiredToken
            | Self::TokenNotFound
            | Self::TokenBlacklisted
            | Self::InvalidTokenType => StatusCode::UNAUTHORIZED,

            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,

            Self::TokenGenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,

            Self::TokenStorageFailed | Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// fetcherror代码（用于前端判断）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAuthorizationCode => "INVALID_AUTHORIZATION_CODE",
            Self::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            Self::TokenNotFound => "TOKEN_NOT_FOUND",
            Self::TokenBlacklisted => "TOKEN_BLACKLISTED",
            Self::InvalidTokenType => "INVALID_TOKEN_TYPE",
            Self::TokenGenerationFailed => "TOKEN_GENERATION_FAILED",
            Self::TokenStorageFailed => "TOKEN_STORAGE_FAILED",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Generic message safe to show to clients. Never includes internal detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidAuthorizationCode => "Invalid authorization code",
            Self::InvalidOrExpiredToken => "Invalid or expired token",
            Self::TokenNotFound => "Token not found",
            Self::TokenBlacklisted => "Token has been revoked",
            Self::InvalidTokenType => "Invalid token type",
            Self::TokenGenerationFailed => "Failed to generate tokens",
            Self::TokenStorageFailed => "Failed to store tokens",
            Self::ServiceUnavailable => "Authentication service temporarily unavailable",
            Self::InvalidRequest(_) => "Invalid request parameters",
        }
    }
}

/// 实现 IntoResponse，使 AuthError 可以直接作为 Axum 响应
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::InvalidRequest(ref reason) = self {
            tracing::debug!("rejecting malformed request: {}", reason);
        }
        error_response(self.status_code(), self.error_code(), self.user_message())
    }
}
