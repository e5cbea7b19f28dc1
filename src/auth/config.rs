//! 认证配置管理

use std::time::Duration;
use thiserror::Error;

/// Configuration problems detected at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub jwt: JwtConfig,
    pub google: GoogleConfig,
    pub store: StoreConfig,
    pub session: SessionSettings,
    /// Browser is redirected here after the provider callback
    pub frontend_url: String,
    /// Comma-separated allowed origins
    pub cors_origin: String,
}

/// Session token settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
}

/// Upstream identity provider settings
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub timeout: Duration,
}

/// Transient store settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// `memory` or a sqlx SQLite URL
    pub database_url: String,
    pub cleanup_interval: Duration,
}

/// Lifetimes and policy used by the session orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub state_ttl: Duration,
    pub exchange_code_ttl: Duration,
    /// Abort a refresh when the old refresh token cannot be blacklisted
    pub strict_rotation: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(168 * 3600),
            state_ttl: Duration::from_secs(10 * 60),
            exchange_code_ttl: Duration::from_secs(5 * 60),
            strict_rotation: false,
        }
    }
}

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

impl GoogleConfig {
    /// Google endpoints with the given credentials
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl AuthConfig {
    /// from环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_ttl = Duration::from_secs(env_parse::<u64>("JWT_ACCESS_TTL", 15)? * 60);
        let refresh_ttl = Duration::from_secs(env_parse::<u64>("JWT_REFRESH_TTL", 168)? * 3600);

        let config = Self {
            host: env_or("AUTH_HOST", "0.0.0.0"),
            port: env_parse("PORT", 8081)?,
            log_level: env_or("LOG_LEVEL", "info"),
            jwt: JwtConfig {
                secret: env_opt("JWT_SECRET").unwrap_or_default(),
                issuer: env_or("JWT_ISSUER", "auth-service"),
            },
            google: GoogleConfig {
                client_id: env_opt("GOOGLE_CLIENT_ID").unwrap_or_default(),
                client_secret: env_opt("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
                redirect_url: env_or(
                    "GOOGLE_REDIRECT_URL",
                    "http://localhost:8081/api/v1/auth/google/callback",
                ),
                auth_url: env_or("GOOGLE_AUTH_URL", GOOGLE_AUTH_URL),
                token_url: env_or("GOOGLE_TOKEN_URL", GOOGLE_TOKEN_URL),
                userinfo_url: env_or("GOOGLE_USERINFO_URL", GOOGLE_USERINFO_URL),
                timeout: Duration::from_secs(env_parse("GOOGLE_HTTP_TIMEOUT", 30)?),
            },
            store: StoreConfig {
                database_url: env_or("AUTH_DATABASE_URL", "sqlite://./auth-transient.db"),
                cleanup_interval: Duration::from_secs(env_parse("STORE_CLEANUP_INTERVAL", 60)?),
            },
            session: SessionSettings {
                access_ttl,
                refresh_ttl,
                state_ttl: Duration::from_secs(env_parse("OAUTH_STATE_TTL", 600)?),
                exchange_code_ttl: Duration::from_secs(env_parse("EXCHANGE_CODE_TTL", 300)?),
                strict_rotation: env_parse("STRICT_REFRESH_ROTATION", false)?,
            },
            frontend_url: env_or("FRONTEND_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            cors_origin: env_or("CORS_ALLOW_ORIGIN", "http://localhost:3000"),
        };

        config.validate()?;
        Ok(config)
    }

    /// validate配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.google.client_id.is_empty() {
            return Err(ConfigError::Missing("GOOGLE_CLIENT_ID"));
        }
        if self.google.client_secret.is_empty() {
            return Err(ConfigError::Missing("GOOGLE_CLIENT_SECRET"));
        }
        if self.jwt.secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.jwt.secret.len() < 32 {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                reason: "must be at least 32 characters".to_string(),
            });
        }
        if self.session.access_ttl.is_zero() || self.session.refresh_ttl <= self.session.access_ttl {
            return Err(ConfigError::Invalid {
                key: "JWT_REFRESH_TTL",
                reason: "refresh lifetime must exceed the access lifetime".to_string(),
            });
        }
        if self.session.state_ttl.is_zero() || self.session.exchange_code_ttl.is_zero() {
            return Err(ConfigError::Invalid {
                key: "OAUTH_STATE_TTL",
                reason: "state and exchange code lifetimes must be positive".to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

pub(crate) fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
