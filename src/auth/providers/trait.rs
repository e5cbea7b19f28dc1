//! OAuth提供商trait定义

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::types::ExternalIdentity;

/// Identity provider failures. Detail is for logs only; callers collapse
/// all of these into a single invalid-code condition.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} returned status {status}: {detail}")]
    Status {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    #[error("{operation} returned a malformed payload: {detail}")]
    Malformed {
        operation: &'static str,
        detail: String,
    },

    #[error("identity is missing required fields")]
    IncompleteIdentity,

    #[error("identity email is not verified")]
    UnverifiedEmail,
}

/// OAuth提供商trait
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 提供商名称
    fn name(&self) -> &str;

    /// Consent URL embedding the caller's state nonce
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a verified identity
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, ProviderError>;
}
