//! Google OAuth提供商实现
//!
//! Authorization-code flow: code → provider access token → userinfo profile.
//! No retries here; a failed hop fails the exchange.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use super::r#trait::{IdentityProvider, ProviderError};
use crate::auth::{config::GoogleConfig, types::ExternalIdentity};

const SCOPES: &[&str] = &[
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Userinfo v2 payload
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    verified_email: bool,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

impl From<GoogleUserInfo> for ExternalIdentity {
    fn from(info: GoogleUserInfo) -> Self {
        Self {
            id: info.id,
            email: info.email,
            name: info.name,
            picture: info.picture,
            email_verified: info.verified_email,
        }
    }
}

/// Google OAuth提供商
pub struct GoogleProvider {
    config: GoogleConfig,
    http: reqwest::Client,
}

impl GoogleProvider {
    /// 创建新的Google提供商
    pub fn new(config: GoogleConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| ProviderError::Transport {
                operation: "client setup",
                source,
            })?;
        Ok(Self { config, http })
    }

    async fn fetch_access_token(&self, code: &str) -> Result<String, ProviderError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                operation: "token exchange",
                source,
            })?;

        let response = Self::ensure_success(response, "token exchange").await?;
        let body: TokenResponse = response.json().await.map_err(|e| ProviderError::Malformed {
            operation: "token exchange",
            detail: e.to_string(),
        })?;

        if body.access_token.is_empty() {
            return Err(ProviderError::Malformed {
                operation: "token exchange",
                detail: "empty access_token".to_string(),
            });
        }
        Ok(body.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ExternalIdentity, ProviderError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                operation: "userinfo request",
                source,
            })?;

        let response = Self::ensure_success(response, "userinfo request").await?;
        let info: GoogleUserInfo = response.json().await.map_err(|e| ProviderError::Malformed {
            operation: "userinfo request",
            detail: e.to_string(),
        })?;
        Ok(info.into())
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            operation,
            status,
            detail,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &str) -> String {
        let params = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("scope", &SCOPES.join(" ")),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];

        match Url::parse_with_params(&self.config.auth_url, &params) {
            Ok(url) => url.into(),
            // Config is validated at startup; fall back to manual joining anyway.
            Err(_) => format!(
                "{}?{}",
                self.config.auth_url,
                params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&")
            ),
        }
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, ProviderError> {
        let access_token = self.fetch_access_token(code).await?;
        debug!("provider access token obtained");

        let identity = self.fetch_profile(&access_token).await?;

        if identity.id.trim().is_empty() || identity.email.trim().is_empty() {
            return Err(ProviderError::IncompleteIdentity);
        }
        if !identity.email_verified {
            return Err(ProviderError::UnverifiedEmail);
        }

        info!("Google identity resolved: subject={}", identity.id);
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GoogleProvider {
        GoogleProvider::new(GoogleConfig::new(
            "test-client",
            "test-secret",
            "https://auth.example.com/api/v1/auth/google/callback",
        ))
        .unwrap()
    }

    #[test]
    fn test_authorization_url_parameters() {
        let url = Url::parse(&provider().authorization_url("state-123")).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(pairs["client_id"], "test-client");
        assert_eq!(pairs["state"], "state-123");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(
            pairs["redirect_uri"],
            "https://auth.example.com/api/v1/auth/google/callback"
        );
        assert!(pairs["scope"].contains("openid"));
        assert!(pairs["scope"].contains("userinfo.email"));
    }

    #[test]
    fn test_authorization_url_is_deterministic() {
        let provider = provider();
        assert_eq!(provider.authorization_url("s"), provider.authorization_url("s"));
        assert_ne!(provider.authorization_url("s1"), provider.authorization_url("s2"));
    }

    #[test]
    fn test_state_is_url_encoded() {
        let url = provider().authorization_url("a b&c");
        assert!(url.contains("state=a+b%26c"));
    }
}
