//! 存储层trait定义

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

use crate::auth::types::{ExternalIdentity, StoredToken, TokenKind};

/// Transient store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("stored payload could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store is shutting down")]
    Closed,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => Self::Closed,
            other => Self::Backend(other.to_string()),
        }
    }
}

/// Entry classes held by the store. Each class has its own key namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    State,
    ExchangeCode,
    AccessToken,
    RefreshToken,
    Blacklist,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::ExchangeCode => "code",
            Self::AccessToken => "access",
            Self::RefreshToken => "refresh",
            Self::Blacklist => "blacklist",
        }
    }

    /// 键前缀
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::State => "auth:state:",
            Self::ExchangeCode => "auth:code:",
            Self::AccessToken => "auth:access:",
            Self::RefreshToken => "auth:refresh:",
            Self::Blacklist => "auth:blacklist:",
        }
    }

    /// Storage key for `value`. Bearer material is hashed, never stored verbatim.
    pub fn key(&self, value: &str) -> String {
        let digest = Sha256::digest(value.as_bytes());
        format!("{}{}", self.prefix(), hex::encode(digest))
    }

    pub fn for_token(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Access => Self::AccessToken,
            TokenKind::Refresh => Self::RefreshToken,
        }
    }
}

/// Short-lived server-side state with expiry.
///
/// Every `take_*` is an atomic read-and-delete: of two concurrent takers of
/// the same value at most one observes it.
#[async_trait]
pub trait TransientStore: Send + Sync {
    /// Store a CSRF state nonce
    async fn put_state(&self, state: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Consume a state nonce. `true` iff it was present and unexpired.
    async fn take_state(&self, state: &str) -> Result<bool, StoreError>;

    /// Stage a verified identity behind a one-time exchange code
    async fn put_exchange_code(
        &self,
        code: &str,
        identity: &ExternalIdentity,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Consume an exchange code
    async fn take_exchange_code(&self, code: &str) -> Result<Option<ExternalIdentity>, StoreError>;

    /// Record an issued token
    async fn put_token(
        &self,
        kind: TokenKind,
        token: &str,
        record: &StoredToken,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    async fn get_token(&self, kind: TokenKind, token: &str) -> Result<Option<StoredToken>, StoreError>;

    /// Consume a token record. Used by refresh rotation so one refresh token
    /// can mint at most one new pair.
    async fn take_token(&self, kind: TokenKind, token: &str) -> Result<Option<StoredToken>, StoreError>;

    async fn delete_token(&self, kind: TokenKind, token: &str) -> Result<(), StoreError>;

    /// Remove every access and refresh record of a subject. Returns the count removed.
    async fn delete_subject_tokens(&self, user_id: &str) -> Result<u64, StoreError>;

    /// Revoke a token for `ttl`
    async fn blacklist(&self, token: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError>;

    /// Drop expired entries. Returns the count removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;

    /// 健康检查
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Absolute deadline in unix milliseconds
pub(crate) fn deadline_ms(ttl: Duration) -> i64 {
    now_ms().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
