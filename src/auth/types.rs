//! 认证模块类型定义

use serde::{Deserialize, Serialize};

/// Identity returned by the upstream identity provider after a code exchange.
///
/// Only lives in-flight and while staged behind an exchange code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Provider-side subject id
    pub id: String,
    /// Email
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Avatar URL
    #[serde(default)]
    pub picture: String,
    /// Whether the provider verified the email address
    #[serde(default)]
    pub email_verified: bool,
}

impl ExternalIdentity {
    /// An identity is usable only with an id, an email and a verified email flag.
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && !self.email.trim().is_empty() && self.email_verified
    }
}

/// Token class carried in every session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived bearer credential
    Access,
    /// Long-lived credential that only mints new pairs
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject identity embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: String,
    pub email: String,
    pub kind: TokenKind,
}

impl TokenClaims {
    pub fn access(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            kind: TokenKind::Access,
        }
    }

    pub fn refresh(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            kind: TokenKind::Refresh,
        }
    }
}

/// Server-side record of an issued token, keyed by the token itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub user_id: String,
    pub email: String,
    /// Unix seconds
    pub issued_at: i64,
    /// Unix seconds
    pub expires_at: i64,
}

/// Successful validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedSubject {
    pub user_id: String,
    pub email: String,
}

// ========== HTTP DTOs ==========

/// `GET /auth/google` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
    pub state: String,
}

/// Provider redirect query (`GET /auth/google/callback`)
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    /// Set by the provider when the user denied consent
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /auth/exchange`
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub auth_code: String,
}

/// `POST /auth/refresh`
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// `POST /auth/logout`
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    /// May be omitted when the token is sent as a bearer header
    #[serde(default)]
    pub access_token: String,
}

/// User summary returned alongside a token pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub picture: String,
}

impl From<&ExternalIdentity> for UserInfo {
    fn from(identity: &ExternalIdentity) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.picture.clone(),
        }
    }
}

/// Access + refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Exchange and refresh response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user: UserInfo,
    pub tokens: TokenPair,
}

/// `GET /auth/validate` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl From<ValidatedSubject> for ValidationResponse {
    fn from(subject: ValidatedSubject) -> Self {
        Self {
            valid: true,
            user_id: subject.user_id,
            email: subject.email,
        }
    }
}
