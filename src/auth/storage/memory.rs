//! 内存存储实现（用于开发和测试）
//!
//! Single-process only. Expired entries are skipped on read and removed by
//! `purge_expired`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::r#trait::{deadline_ms, now_ms, EntryKind, StoreError, TransientStore};
use crate::auth::types::{ExternalIdentity, StoredToken, TokenKind};

#[derive(Debug, Clone)]
struct Entry {
    kind: EntryKind,
    subject: Option<String>,
    payload: String,
    expires_at_ms: i64,
}

impl Entry {
    fn is_live(&self, now: i64) -> bool {
        now < self.expires_at_ms
    }
}

/// 内存存储
#[derive(Default)]
pub struct MemoryTransientStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryTransientStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, live or not
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, kind: EntryKind, value: &str, subject: Option<&str>, payload: String, ttl: Duration) {
        let entry = Entry {
            kind,
            subject: subject.map(str::to_string),
            payload,
            expires_at_ms: deadline_ms(ttl),
        };
        self.entries.lock().insert(kind.key(value), entry);
    }

    fn take(&self, kind: EntryKind, value: &str) -> Option<Entry> {
        let now = now_ms();
        self.entries
            .lock()
            .remove(&kind.key(value))
            .filter(|entry| entry.is_live(now))
    }

    fn get(&self, kind: EntryKind, value: &str) -> Option<Entry> {
        let now = now_ms();
        self.entries
            .lock()
            .get(&kind.key(value))
            .filter(|entry| entry.is_live(now))
            .cloned()
    }
}

#[async_trait]
impl TransientStore for MemoryTransientStore {
    async fn put_state(&self, state: &str, ttl: Duration) -> Result<(), StoreError> {
        self.insert(EntryKind::State, state, None, String::new(), ttl);
        Ok(())
    }

    async fn take_state(&self, state: &str) -> Result<bool, StoreError> {
        Ok(self.take(EntryKind::State, state).is_some())
    }

    async fn put_exchange_code(
        &self,
        code: &str,
        identity: &ExternalIdentity,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(identity)?;
        self.insert(EntryKind::ExchangeCode, code, Some(&identity.id), payload, ttl);
        Ok(())
    }

    async fn take_exchange_code(&self, code: &str) -> Result<Option<ExternalIdentity>, StoreError> {
        match self.take(EntryKind::ExchangeCode, code) {
            Some(entry) => Ok(Some(serde_json::from_str(&entry.payload)?)),
            None => Ok(None),
        }
    }

    async fn put_token(
        &self,
        kind: TokenKind,
        token: &str,
        record: &StoredToken,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(record)?;
        self.insert(EntryKind::for_token(kind), token, Some(&record.user_id), payload, ttl);
        Ok(())
    }

    async fn get_token(&self, kind: TokenKind, token: &str) -> Result<Option<StoredToken>, StoreError> {
        match self.get(EntryKind::for_token(kind), token) {
            Some(entry) => Ok(Some(serde_json::from_str(&entry.payload)?)),
            None => Ok(None),
        }
    }

    async fn take_token(&self, kind: TokenKind, token: &str) -> Result<Option<StoredToken>, StoreError> {
        match self.take(EntryKind::for_token(kind), token) {
            Some(entry) => Ok(Some(serde_json::from_str(&entry.payload)?)),
            None => Ok(None),
        }
    }

    async fn delete_token(&self, kind: TokenKind, token: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(&EntryKind::for_token(kind).key(token));
        Ok(())
    }

    async fn delete_subject_tokens(&self, user_id: &str) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| {
            let is_token = matches!(entry.kind, EntryKind::AccessToken | EntryKind::RefreshToken);
            !(is_token && entry.subject.as_deref() == Some(user_id))
        });
        Ok((before - entries.len()) as u64)
    }

    async fn blacklist(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        self.insert(EntryKind::Blacklist, token, None, String::new(), ttl);
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.get(EntryKind::Blacklist, token).is_some())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = now_ms();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let removed = (before - entries.len()) as u64;
        if removed > 0 {
            debug!("memory store purged {} expired entries", removed);
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const HOUR: Duration = Duration::from_secs(3600);

    fn identity(id: &str) -> ExternalIdentity {
        ExternalIdentity {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: "Test".to_string(),
            picture: String::new(),
            email_verified: true,
        }
    }

    fn record(user_id: &str) -> StoredToken {
        StoredToken {
            user_id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
            issued_at: 0,
            expires_at: 900,
        }
    }

    #[tokio::test]
    async fn test_state_is_single_use() {
        let store = MemoryTransientStore::new();
        store.put_state("nonce", HOUR).await.unwrap();
        assert!(store.take_state("nonce").await.unwrap());
        assert!(!store.take_state("nonce").await.unwrap());
        assert!(!store.take_state("never-issued").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        let store = MemoryTransientStore::new();
        store.put_state("nonce", Duration::ZERO).await.unwrap();
        store.blacklist("tok", Duration::ZERO).await.unwrap();
        store
            .put_token(TokenKind::Access, "tok", &record("u1"), Duration::ZERO)
            .await
            .unwrap();

        assert!(!store.take_state("nonce").await.unwrap());
        assert!(!store.is_blacklisted("tok").await.unwrap());
        assert!(store.get_token(TokenKind::Access, "tok").await.unwrap().is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_code_round_trip() {
        let store = MemoryTransientStore::new();
        store.put_exchange_code("code", &identity("g-1"), HOUR).await.unwrap();
        assert_eq!(store.take_exchange_code("code").await.unwrap(), Some(identity("g-1")));
        assert_eq!(store.take_exchange_code("code").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_token_classes_are_separate() {
        let store = MemoryTransientStore::new();
        store.put_token(TokenKind::Refresh, "tok", &record("u1"), HOUR).await.unwrap();
        assert!(store.get_token(TokenKind::Access, "tok").await.unwrap().is_none());
        assert_eq!(store.get_token(TokenKind::Refresh, "tok").await.unwrap(), Some(record("u1")));

        assert_eq!(store.take_token(TokenKind::Refresh, "tok").await.unwrap(), Some(record("u1")));
        assert!(store.take_token(TokenKind::Refresh, "tok").await.unwrap().is_none());

        store.put_token(TokenKind::Access, "tok", &record("u1"), HOUR).await.unwrap();
        store.delete_token(TokenKind::Access, "tok").await.unwrap();
        assert!(store.get_token(TokenKind::Access, "tok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_subject_tokens_only_touches_that_subject() {
        let store = MemoryTransientStore::new();
        store.put_token(TokenKind::Access, "a1", &record("u1"), HOUR).await.unwrap();
        store.put_token(TokenKind::Refresh, "r1", &record("u1"), HOUR).await.unwrap();
        store.put_token(TokenKind::Access, "a2", &record("u2"), HOUR).await.unwrap();
        store.put_exchange_code("c1", &identity("u1"), HOUR).await.unwrap();

        assert_eq!(store.delete_subject_tokens("u1").await.unwrap(), 2);
        assert!(store.get_token(TokenKind::Access, "a2").await.unwrap().is_some());
        assert!(store.take_exchange_code("c1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_take_single_winner() {
        let store = Arc::new(MemoryTransientStore::new());
        store.put_exchange_code("race", &identity("g-1"), HOUR).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.take_exchange_code("race").await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
