//! Token管理服务
//!
//! HS256 session tokens. Verification is a pure function of the token string,
//! the secret and the clock; revocation is layered on top by the orchestrator.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::auth::types::{TokenClaims, TokenKind};

/// Codec failures. Every attacker-controlled input maps to one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("weak signing secret: {0}")]
    WeakSecret(String),

    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("malformed token")]
    Malformed,

    #[error("signature mismatch")]
    Signature,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("unexpected issuer")]
    Issuer,
}

/// JWT Claims
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    user_id: String,
    email: String,
    #[serde(rename = "type")]
    kind: TokenKind,
    sub: String,
    iss: String,
    iat: i64,
    nbf: i64,
    exp: i64,
    jti: String,
}

/// Verified token contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub claims: TokenClaims,
    /// Unix seconds
    pub issued_at: i64,
    /// Unix seconds
    pub expires_at: i64,
}

impl VerifiedToken {
    /// Seconds of natural life left at `now`, never below one second
    pub fn remaining_lifetime(&self, now: i64) -> Duration {
        Duration::from_secs((self.expires_at - now).max(1) as u64)
    }
}

/// Token管理服务
pub struct TokenService {
    /// JWT密钥（使用Zeroizing保护内存）
    secret: zeroize::Zeroizing<String>,
    issuer: String,
}

impl TokenService {
    /// 创建新的Token服务（带密钥强度validate）
    ///
    /// # Security
    /// - 拒绝弱密钥（<32字符）
    /// - 拒绝已知的占位密钥
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.len() < 32 {
            return Err(TokenError::WeakSecret(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        const PLACEHOLDER_SECRETS: &[&str] = &[
            "dev_secret_key_change_in_production",
            "your-super-secret-jwt-key-change-this",
            "changeme-changeme-changeme-changeme",
        ];
        if PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
            return Err(TokenError::WeakSecret("placeholder JWT secret".to_string()));
        }
        if secret.chars().all(|c| Some(c) == secret.chars().next()) {
            return Err(TokenError::WeakSecret("single-character JWT secret".to_string()));
        }

        Ok(Self {
            secret: zeroize::Zeroizing::new(secret),
            issuer: issuer.into(),
        })
    }

    /// Sign `claims` with lifetime `ttl`, using the wall clock
    pub fn issue(&self, claims: &TokenClaims, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(claims, ttl, chrono::Utc::now().timestamp())
    }

    /// Sign `claims` as if issued at `now` (unix seconds)
    pub fn issue_at(&self, claims: &TokenClaims, ttl: Duration, now: i64) -> Result<String, TokenError> {
        let body = Claims {
            user_id: claims.user_id.clone(),
            email: claims.email.clone(),
            kind: claims.kind,
            sub: claims.user_id.clone(),
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + ttl.as_secs() as i64,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &body,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify against the wall clock
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify as of `now` (unix seconds). Expired iff `now > exp`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<VerifiedToken, TokenError> {
        // Only HS256 is accepted; the header algorithm is never negotiated.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iat", "iss", "sub"]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            debug!("token rejected: {:?}", e.kind());
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::Signature,
                ErrorKind::InvalidIssuer => TokenError::Issuer,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.sub != claims.user_id {
            return Err(TokenError::Malformed);
        }
        if now < claims.nbf {
            return Err(TokenError::NotYetValid);
        }
        if now > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken {
            claims: TokenClaims {
                user_id: claims.user_id,
                email: claims.email,
                kind: claims.kind,
            },
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}
