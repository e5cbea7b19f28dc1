//! 会话编排集成测试
//!
//! Login flow properties against both store backends.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use session_gate::auth::{
    storage::{MemoryTransientStore, SqlTransientStore, TransientStore},
    AuthError, AuthService,
};
use std::sync::Arc;

async fn sql_store() -> Arc<dyn TransientStore> {
    Arc::new(SqlTransientStore::connect("sqlite::memory:").await.unwrap())
}

async fn stores() -> Vec<(&'static str, Arc<dyn TransientStore>)> {
    vec![
        ("memory", Arc::new(MemoryTransientStore::new()) as Arc<dyn TransientStore>),
        ("sql", sql_store().await),
    ]
}

async fn exchange_code(service: &AuthService) -> String {
    let url = service.auth_url().await.unwrap();
    service.handle_callback(&url.state, GOOD_CODE).await.unwrap()
}

#[tokio::test]
async fn test_happy_path_on_every_backend() {
    for (backend, store) in stores().await {
        let service = auth_service_with(store, FakeProvider::verified());

        let code = exchange_code(&service).await;
        let session = service.exchange_auth_code(&code).await.unwrap();
        assert_eq!(session.user.id, "u1", "{}", backend);
        assert_eq!(session.user.email, "a@b.com", "{}", backend);

        let subject = service.validate(&session.tokens.access_token).await.unwrap();
        assert_eq!(subject.user_id, "u1", "{}", backend);
    }
}

#[tokio::test]
async fn test_replays_rejected_on_every_backend() {
    for (backend, store) in stores().await {
        let service = auth_service_with(store, FakeProvider::verified());

        let url = service.auth_url().await.unwrap();
        let code = service.handle_callback(&url.state, GOOD_CODE).await.unwrap();
        assert_eq!(
            service.handle_callback(&url.state, GOOD_CODE).await,
            Err(AuthError::InvalidAuthorizationCode),
            "{}: state replay",
            backend
        );

        service.exchange_auth_code(&code).await.unwrap();
        assert_eq!(
            service.exchange_auth_code(&code).await.unwrap_err(),
            AuthError::InvalidAuthorizationCode,
            "{}: code replay",
            backend
        );
    }
}

#[tokio::test]
async fn test_rotation_and_logout_on_every_backend() {
    for (backend, store) in stores().await {
        let service = auth_service_with(store, FakeProvider::verified());

        let first = service.exchange_auth_code(&exchange_code(&service).await).await.unwrap();
        let second = service.refresh(&first.tokens.refresh_token).await.unwrap();
        let replay = service.refresh(&first.tokens.refresh_token).await.unwrap_err();
        assert!(
            matches!(replay, AuthError::TokenBlacklisted | AuthError::TokenNotFound),
            "{}: {:?}",
            backend,
            replay
        );

        let other = service.exchange_auth_code(&exchange_code(&service).await).await.unwrap();
        service.logout(&second.tokens.access_token).await.unwrap();

        for token in [&second.tokens.access_token, &other.tokens.access_token] {
            assert!(service.validate(token).await.is_err(), "{}: access survived logout", backend);
        }
        for token in [&second.tokens.refresh_token, &other.tokens.refresh_token] {
            assert!(service.refresh(token).await.is_err(), "{}: refresh survived logout", backend);
        }
    }
}

#[tokio::test]
async fn test_concurrent_exchange_issues_one_session() {
    for (backend, store) in stores().await {
        let service = Arc::new(auth_service_with(store, FakeProvider::verified()));
        let code = exchange_code(&service).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let code = code.clone();
                tokio::spawn(async move { service.exchange_auth_code(&code).await })
            })
            .collect();

        let mut issued = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => issued += 1,
                Err(e) => assert_eq!(e, AuthError::InvalidAuthorizationCode),
            }
        }
        assert_eq!(issued, 1, "{}", backend);
    }
}

#[tokio::test]
async fn test_concurrent_refresh_rotates_once() {
    let service = Arc::new(auth_service());
    let session = service.exchange_auth_code(&exchange_code(&service).await).await.unwrap();
    let refresh_token = session.tokens.refresh_token;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let token = refresh_token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        })
        .collect();

    let mut rotated = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            rotated += 1;
        }
    }
    assert_eq!(rotated, 1);
}

#[tokio::test]
async fn test_unverified_identity_never_reaches_exchange() {
    let service = auth_service_with(Arc::new(MemoryTransientStore::new()), FakeProvider::unverified());
    let url = service.auth_url().await.unwrap();
    assert_eq!(
        service.handle_callback(&url.state, GOOD_CODE).await,
        Err(AuthError::InvalidAuthorizationCode)
    );
}

#[tokio::test]
async fn test_forged_state_rejected() {
    let service = auth_service();
    assert_eq!(
        service.handle_callback("wrong_state", GOOD_CODE).await,
        Err(AuthError::InvalidAuthorizationCode)
    );
}

#[tokio::test]
async fn test_token_from_other_issuer_rejected() {
    let service = auth_service();
    let foreign = session_gate::auth::core::TokenService::new(SECRET, "someone-else")
        .unwrap()
        .issue(
            &session_gate::auth::TokenClaims::access("u1", "a@b.com"),
            std::time::Duration::from_secs(60),
        )
        .unwrap();
    assert_eq!(
        service.validate(&foreign).await.unwrap_err(),
        AuthError::InvalidOrExpiredToken
    );
}
