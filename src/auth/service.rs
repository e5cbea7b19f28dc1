//! 认证服务（整合层）
//!
//! Session orchestrator. Owns every state transition of the login flow:
//! auth URL → provider callback → exchange code → token pair → refresh / logout.
//! The store only executes what this service tells it to.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::auth::{
    config::{AuthConfig, SessionSettings},
    core::{TokenService, VerifiedToken},
    errors::AuthError,
    providers::IdentityProvider,
    storage::TransientStore,
    types::*,
};

/// Audit log target for security-relevant events
pub const AUDIT_TARGET: &str = "audit";

const NONCE_BYTES: usize = 32;

/// 认证服务（门面模式）
pub struct AuthService {
    tokens: TokenService,
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn TransientStore>,
    settings: SessionSettings,
}

impl AuthService {
    /// 创建新的认证服务
    pub fn new(
        tokens: TokenService,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn TransientStore>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            tokens,
            provider,
            store,
            settings,
        }
    }

    /// Build from validated configuration
    pub fn from_config(
        config: &AuthConfig,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn TransientStore>,
    ) -> anyhow::Result<Self> {
        let tokens = TokenService::new(config.jwt.secret.clone(), config.jwt.issuer.clone())?;
        Ok(Self::new(tokens, provider, store, config.session.clone()))
    }

    /// 生成Google授权URL
    ///
    /// Stores a fresh CSRF state nonce and embeds it in the provider consent URL.
    pub async fn auth_url(&self) -> Result<AuthUrlResponse, AuthError> {
        let state = random_nonce();
        self.store
            .put_state(&state, self.settings.state_ttl)
            .await
            .map_err(|e| {
                warn!("failed to store OAuth state: {}", e);
                AuthError::ServiceUnavailable
            })?;

        let auth_url = self.provider.authorization_url(&state);
        debug!("issued {} auth URL", self.provider.name());
        Ok(AuthUrlResponse { auth_url, state })
    }

    /// 处理OAuth回调
    ///
    /// Consumes the state nonce, exchanges the provider code and stages the
    /// identity behind a one-time exchange code. Every failure is reported as
    /// `InvalidAuthorizationCode`.
    pub async fn handle_callback(&self, state: &str, code: &str) -> Result<String, AuthError> {
        if state.is_empty() || code.is_empty() {
            return Err(AuthError::InvalidAuthorizationCode);
        }

        match self.store.take_state(state).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(target: AUDIT_TARGET, "callback rejected: unknown or replayed state");
                return Err(AuthError::InvalidAuthorizationCode);
            }
            Err(e) => {
                warn!("state lookup failed: {}", e);
                return Err(AuthError::InvalidAuthorizationCode);
            }
        }

        let identity = self.provider.exchange_code(code).await.map_err(|e| {
            warn!(target: AUDIT_TARGET, "{} code exchange failed: {}", self.provider.name(), e);
            AuthError::InvalidAuthorizationCode
        })?;

        if !identity.is_valid() {
            warn!(target: AUDIT_TARGET, "callback rejected: incomplete or unverified identity");
            return Err(AuthError::InvalidAuthorizationCode);
        }

        let exchange_code = random_nonce();
        self.store
            .put_exchange_code(&exchange_code, &identity, self.settings.exchange_code_ttl)
            .await
            .map_err(|e| {
                warn!("failed to stage exchange code: {}", e);
                AuthError::InvalidAuthorizationCode
            })?;

        info!(target: AUDIT_TARGET, user_id = %identity.id, "provider login accepted");
        Ok(exchange_code)
    }

    /// 兑换一次性授权码
    pub async fn exchange_auth_code(&self, code: &str) -> Result<SessionResponse, AuthError> {
        let identity = self
            .store
            .take_exchange_code(code)
            .await
            .map_err(|e| {
                warn!("exchange code lookup failed: {}", e);
                AuthError::ServiceUnavailable
            })?
            .ok_or(AuthError::InvalidAuthorizationCode)?;

        let tokens = self.issue_pair(&identity.id, &identity.email).await?;

        info!(target: AUDIT_TARGET, user_id = %identity.id, "session issued");
        Ok(SessionResponse {
            user: UserInfo::from(&identity),
            tokens,
        })
    }

    /// Rotate a refresh token into a new pair. The presented token is consumed.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionResponse, AuthError> {
        self.ensure_not_blacklisted(refresh_token).await?;

        let verified = self.verify(refresh_token)?;
        if verified.claims.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidTokenType);
        }

        let record = self
            .store
            .take_token(TokenKind::Refresh, refresh_token)
            .await
            .map_err(|e| {
                warn!("refresh record lookup failed: {}", e);
                AuthError::ServiceUnavailable
            })?;
        let Some(record) = record else {
            warn!(
                target: AUDIT_TARGET,
                user_id = %verified.claims.user_id,
                "refresh rejected: no server-side record"
            );
            return Err(AuthError::TokenNotFound);
        };

        let pair = self.mint_pair(&record.user_id, &record.email)?;

        let now = chrono::Utc::now().timestamp();
        if let Err(e) = self
            .store
            .blacklist(refresh_token, verified.remaining_lifetime(now))
            .await
        {
            if self.settings.strict_rotation {
                warn!("refresh aborted: old refresh token could not be revoked: {}", e);
                return Err(AuthError::TokenStorageFailed);
            }
            warn!("old refresh token not blacklisted: {}", e);
        }

        self.persist_pair(&record.user_id, &record.email, &pair).await?;

        info!(target: AUDIT_TARGET, user_id = %record.user_id, "refresh token rotated");
        Ok(SessionResponse {
            user: UserInfo {
                id: record.user_id,
                email: record.email,
                name: String::new(),
                picture: String::new(),
            },
            tokens: pair.into_response(self.settings.access_ttl),
        })
    }

    /// Revoke every session of the token's subject
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let verified = self.verify(token)?;
        let user_id = &verified.claims.user_id;

        let removed = self.store.delete_subject_tokens(user_id).await.map_err(|e| {
            warn!("failed to delete session tokens: {}", e);
            AuthError::TokenStorageFailed
        })?;

        let now = chrono::Utc::now().timestamp();
        if let Err(e) = self.store.blacklist(token, verified.remaining_lifetime(now)).await {
            warn!("logout token not blacklisted: {}", e);
        }

        info!(target: AUDIT_TARGET, user_id = %user_id, removed, "logout");
        Ok(())
    }

    /// Check an access token: blacklist, signature, type, server record
    pub async fn validate(&self, token: &str) -> Result<ValidatedSubject, AuthError> {
        self.ensure_not_blacklisted(token).await?;

        let verified = self.verify(token)?;
        if verified.claims.kind != TokenKind::Access {
            return Err(AuthError::InvalidTokenType);
        }

        self.store
            .get_token(TokenKind::Access, token)
            .await
            .map_err(|e| {
                warn!("access record lookup failed: {}", e);
                AuthError::ServiceUnavailable
            })?
            .ok_or(AuthError::TokenNotFound)?;

        Ok(ValidatedSubject {
            user_id: verified.claims.user_id,
            email: verified.claims.email,
        })
    }

    /// 健康检查
    pub async fn store_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("transient store unreachable: {}", e);
                false
            }
        }
    }

    async fn ensure_not_blacklisted(&self, token: &str) -> Result<(), AuthError> {
        match self.store.is_blacklisted(token).await {
            Ok(false) => Ok(()),
            Ok(true) => Err(AuthError::TokenBlacklisted),
            Err(e) => {
                warn!("blacklist lookup failed: {}", e);
                Err(AuthError::ServiceUnavailable)
            }
        }
    }

    fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        self.tokens.verify(token).map_err(|e| {
            debug!("token verification failed: {}", e);
            AuthError::InvalidOrExpiredToken
        })
    }

    async fn issue_pair(&self, user_id: &str, email: &str) -> Result<TokenPair, AuthError> {
        let pair = self.mint_pair(user_id, email)?;
        self.persist_pair(user_id, email, &pair).await?;
        Ok(pair.into_response(self.settings.access_ttl))
    }

    fn mint_pair(&self, user_id: &str, email: &str) -> Result<MintedPair, AuthError> {
        let issued_at = chrono::Utc::now().timestamp();
        let mint = |claims: TokenClaims, ttl: Duration| {
            self.tokens.issue_at(&claims, ttl, issued_at).map_err(|e| {
                warn!("token signing failed: {}", e);
                AuthError::TokenGenerationFailed
            })
        };

        Ok(MintedPair {
            access: mint(TokenClaims::access(user_id, email), self.settings.access_ttl)?,
            refresh: mint(TokenClaims::refresh(user_id, email), self.settings.refresh_ttl)?,
            issued_at,
        })
    }

    /// Record both tokens. A half-written pair is rolled back so no access
    /// token outlives a failed issue.
    async fn persist_pair(&self, user_id: &str, email: &str, pair: &MintedPair) -> Result<(), AuthError> {
        let record = |ttl: Duration| StoredToken {
            user_id: user_id.to_string(),
            email: email.to_string(),
            issued_at: pair.issued_at,
            expires_at: pair.issued_at + ttl.as_secs() as i64,
        };

        let access_ttl = self.settings.access_ttl;
        self.store
            .put_token(TokenKind::Access, &pair.access, &record(access_ttl), access_ttl)
            .await
            .map_err(|e| {
                warn!("failed to persist access token: {}", e);
                AuthError::TokenStorageFailed
            })?;

        let refresh_ttl = self.settings.refresh_ttl;
        if let Err(e) = self
            .store
            .put_token(TokenKind::Refresh, &pair.refresh, &record(refresh_ttl), refresh_ttl)
            .await
        {
            warn!("failed to persist refresh token: {}", e);
            if let Err(e) = self.store.delete_token(TokenKind::Access, &pair.access).await {
                warn!("orphaned access record not removed: {}", e);
            }
            return Err(AuthError::TokenStorageFailed);
        }
        Ok(())
    }
}

struct MintedPair {
    access: String,
    refresh: String,
    issued_at: i64,
}

impl MintedPair {
    fn into_response(self, access_ttl: Duration) -> TokenPair {
        TokenPair {
            access_token: self.access,
            refresh_token: self.refresh,
            token_type: "Bearer".to_string(),
            expires_in: access_ttl.as_secs(),
        }
    }
}

/// 256-bit URL-safe random nonce
fn random_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
