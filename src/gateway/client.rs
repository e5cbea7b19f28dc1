//! Auth service client
//!
//! The gateway only needs one question answered: who does this bearer token
//! belong to? `TokenValidator` is that question; the HTTP client asks the auth
//! service, and `AuthService` answers it in-process.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::response::ApiResponse;
use crate::auth::{errors::AuthError, types::ValidatedSubject, types::ValidationResponse, AuthService};

/// Gateway → auth service failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The auth service looked at the token and said no
    #[error("token rejected: {0}")]
    Rejected(String),

    /// The auth service could not be asked or could not answer
    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

/// Resolve a bearer token to its subject
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<ValidatedSubject, GatewayError>;
}

/// HTTP client for `GET /api/v1/auth/validate`
pub struct AuthClient {
    validate_url: String,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self {
            validate_url: format!("{}/api/v1/auth/validate", base_url.trim_end_matches('/')),
            http,
        })
    }
}

#[async_trait]
impl TokenValidator for AuthClient {
    async fn validate(&self, token: &str) -> Result<ValidatedSubject, GatewayError> {
        let response = self
            .http
            .get(&self.validate_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                warn!("auth service request failed: {}", e);
                GatewayError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!("status {}", status)));
        }
        if !status.is_success() {
            debug!("auth service rejected token with status {}", status);
            return Err(GatewayError::Rejected(format!("status {}", status)));
        }

        let body: ApiResponse<ValidationResponse> = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("malformed validate response: {}", e)))?;

        match body.data {
            Some(data) if data.valid && !data.user_id.is_empty() => Ok(ValidatedSubject {
                user_id: data.user_id,
                email: data.email,
            }),
            _ => Err(GatewayError::Rejected("token reported invalid".to_string())),
        }
    }
}

#[async_trait]
impl TokenValidator for AuthService {
    async fn validate(&self, token: &str) -> Result<ValidatedSubject, GatewayError> {
        AuthService::validate(self, token).await.map_err(|e| match e {
            AuthError::ServiceUnavailable => GatewayError::Unavailable(e.to_string()),
            other => GatewayError::Rejected(other.error_code().to_string()),
        })
    }
}
