//! SQLite transient store tests

use session_gate::auth::{
    storage::{SqlTransientStore, StoreError, TransientStore},
    types::{StoredToken, TokenKind},
};
use std::time::Duration;
use tempfile::TempDir;

const HOUR: Duration = Duration::from_secs(3600);

fn record(user_id: &str) -> StoredToken {
    StoredToken {
        user_id: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        issued_at: 1_700_000_000,
        expires_at: 1_700_000_900,
    }
}

fn file_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("transient.db").display())
}

#[tokio::test]
async fn test_file_store_survives_reconnect() {
    let dir = TempDir::new().unwrap();
    let url = file_url(&dir);

    {
        let store = SqlTransientStore::connect(&url).await.unwrap();
        store.put_state("state-nonce-persisted", HOUR).await.unwrap();
        store
            .put_token(TokenKind::Refresh, "refresh-token-persisted", &record("u1"), HOUR)
            .await
            .unwrap();
        store.pool().close().await;
    }

    let store = SqlTransientStore::connect(&url).await.unwrap();
    assert!(store.take_state("state-nonce-persisted").await.unwrap());
    assert_eq!(
        store.get_token(TokenKind::Refresh, "refresh-token-persisted").await.unwrap(),
        Some(record("u1"))
    );
}

#[tokio::test]
async fn test_purge_and_subject_delete() {
    let store = SqlTransientStore::connect("sqlite::memory:").await.unwrap();

    store.put_state("expired-state", Duration::ZERO).await.unwrap();
    store.blacklist("expired-revocation", Duration::ZERO).await.unwrap();
    store.put_state("live-state", HOUR).await.unwrap();
    assert_eq!(store.purge_expired().await.unwrap(), 2);
    assert!(store.take_state("live-state").await.unwrap());

    store.put_token(TokenKind::Access, "a-u1", &record("u1"), HOUR).await.unwrap();
    store.put_token(TokenKind::Refresh, "r-u1", &record("u1"), HOUR).await.unwrap();
    store.put_token(TokenKind::Access, "a-u2", &record("u2"), HOUR).await.unwrap();
    store.blacklist("a-u1-old", HOUR).await.unwrap();

    assert_eq!(store.delete_subject_tokens("u1").await.unwrap(), 2);
    assert_eq!(store.get_token(TokenKind::Access, "a-u1").await.unwrap(), None);
    assert!(store.get_token(TokenKind::Access, "a-u2").await.unwrap().is_some());
    // Revocations are not subject records
    assert!(store.is_blacklisted("a-u1-old").await.unwrap());
}

#[tokio::test]
async fn test_take_token_is_single_use() {
    let store = SqlTransientStore::connect("sqlite::memory:").await.unwrap();
    store.put_token(TokenKind::Refresh, "r-u1", &record("u1"), HOUR).await.unwrap();

    // Same token string under the other class is a different entry
    assert_eq!(store.take_token(TokenKind::Access, "r-u1").await.unwrap(), None);
    assert_eq!(store.take_token(TokenKind::Refresh, "r-u1").await.unwrap(), Some(record("u1")));
    assert_eq!(store.take_token(TokenKind::Refresh, "r-u1").await.unwrap(), None);
}

#[tokio::test]
async fn test_ping_after_close() {
    let store = SqlTransientStore::connect("sqlite::memory:").await.unwrap();
    assert!(store.ping().await.is_ok());

    store.pool().close().await;
    assert!(matches!(store.ping().await, Err(StoreError::Closed)));
}
