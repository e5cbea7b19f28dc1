//! 测试辅助工具
#![allow(dead_code)]

use async_trait::async_trait;
use session_gate::auth::{
    config::SessionSettings,
    core::TokenService,
    providers::{IdentityProvider, ProviderError},
    storage::{MemoryTransientStore, TransientStore},
    types::ExternalIdentity,
    AuthService,
};
use std::sync::Arc;

pub const SECRET: &str = "integration-test-signing-key-0123456789abcdef";
pub const ISSUER: &str = "auth-service";
/// Provider code accepted by `FakeProvider`
pub const GOOD_CODE: &str = "4/0AY0e-good-provider-code";

/// Identity provider returning a canned identity for `GOOD_CODE`
pub struct FakeProvider {
    pub identity: ExternalIdentity,
}

impl FakeProvider {
    pub fn verified() -> Self {
        Self {
            identity: identity("u1", "a@b.com", true),
        }
    }

    pub fn unverified() -> Self {
        Self {
            identity: identity("u1", "a@b.com", false),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn authorization_url(&self, state: &str) -> String {
        format!("https://idp.test/o/oauth2/auth?client_id=test&state={}", state)
    }

    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, ProviderError> {
        if code == GOOD_CODE {
            Ok(self.identity.clone())
        } else {
            Err(ProviderError::Status {
                operation: "token exchange",
                status: 400,
                detail: "invalid_grant".to_string(),
            })
        }
    }
}

pub fn identity(id: &str, email: &str, verified: bool) -> ExternalIdentity {
    ExternalIdentity {
        id: id.to_string(),
        email: email.to_string(),
        name: "Ada Lovelace".to_string(),
        picture: "https://example.com/ada.png".to_string(),
        email_verified: verified,
    }
}

pub fn token_service() -> TokenService {
    TokenService::new(SECRET, ISSUER).unwrap()
}

pub fn auth_service_with(store: Arc<dyn TransientStore>, provider: FakeProvider) -> AuthService {
    AuthService::new(token_service(), Arc::new(provider), store, SessionSettings::default())
}

pub fn auth_service() -> AuthService {
    auth_service_with(Arc::new(MemoryTransientStore::new()), FakeProvider::verified())
}
