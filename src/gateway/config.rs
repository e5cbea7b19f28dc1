//! 网关配置管理

use std::time::Duration;

use crate::auth::config::{env_or, env_parse, ConfigError};

/// API gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Base URL of the auth service
    pub auth_service_url: String,
    pub user_service_url: String,
    pub post_service_url: String,
    pub notification_service_url: String,
    /// Deadline for one token validation round-trip
    pub validate_timeout: Duration,
    /// Deadline for one forwarded request
    pub upstream_timeout: Duration,
    pub cors_origin: String,
}

impl GatewayConfig {
    /// from环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            host: env_or("GATEWAY_HOST", "0.0.0.0"),
            port: env_parse("GATEWAY_PORT", 8080)?,
            log_level: env_or("LOG_LEVEL", "info"),
            auth_service_url: base_url("AUTH_SERVICE_URL", "http://auth-service:8081"),
            user_service_url: base_url("USER_SERVICE_URL", "http://user-service:8082"),
            post_service_url: base_url("POST_SERVICE_URL", "http://post-service:8083"),
            notification_service_url: base_url(
                "NOTIFICATION_SERVICE_URL",
                "http://notification-service:8084",
            ),
            validate_timeout: Duration::from_secs(env_parse("AUTH_VALIDATE_TIMEOUT", 10)?),
            upstream_timeout: Duration::from_secs(env_parse("UPSTREAM_TIMEOUT", 30)?),
            cors_origin: env_or("CORS_ALLOW_ORIGIN", "http://localhost:3000"),
        };
        config.validate()?;
        Ok(config)
    }

    /// validate配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, url) in [
            ("AUTH_SERVICE_URL", &self.auth_service_url),
            ("USER_SERVICE_URL", &self.user_service_url),
            ("POST_SERVICE_URL", &self.post_service_url),
            ("NOTIFICATION_SERVICE_URL", &self.notification_service_url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("not an absolute URL: {}", url),
                });
            }
        }
        if self.validate_timeout.is_zero() || self.upstream_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT",
                reason: "timeouts must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn base_url(key: &str, default: &str) -> String {
    env_or(key, default).trim_end_matches('/').to_string()
}
