//! SQLite-backed transient store
//!
//! Survives restarts and can be shared by several service instances on one host.
//! Single-use consumption relies on `DELETE ... RETURNING`, which SQLite runs
//! as one atomic statement.

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::r#trait::{deadline_ms, now_ms, EntryKind, StoreError, TransientStore};
use crate::auth::types::{ExternalIdentity, StoredToken, TokenKind};

/// SQL transient store
pub struct SqlTransientStore {
    pool: SqlitePool,
}

impl SqlTransientStore {
    /// Connect and run migrations
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        info!("Initializing transient store: {}", database_url);

        let in_memory = database_url.contains(":memory:");
        let mut options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        // Every connection to `:memory:` is its own database, so pin to one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and run migrations
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::raw_sql(include_str!("../../../migrations/transient/001_create_transient_table.sql"))
            .execute(&pool)
            .await?;
        debug!("transient store migrations applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn insert(
        &self,
        kind: EntryKind,
        value: &str,
        subject: Option<&str>,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO transient_entries (key, kind, subject, payload, expires_at_ms)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(kind.key(value))
        .bind(kind.as_str())
        .bind(subject)
        .bind(payload)
        .bind(deadline_ms(ttl))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn take(&self, kind: EntryKind, value: &str) -> Result<Option<String>, StoreError> {
        let payload: Option<String> = sqlx::query_scalar(
            "DELETE FROM transient_entries WHERE key = ? AND expires_at_ms > ? RETURNING payload",
        )
        .bind(kind.key(value))
        .bind(now_ms())
        .fetch_optional(&self.pool)
        .await?;
        Ok(payload)
    }

    async fn get(&self, kind: EntryKind, value: &str) -> Result<Option<String>, StoreError> {
        let payload: Option<String> = sqlx::query_scalar(
            "SELECT payload FROM transient_entries WHERE key = ? AND expires_at_ms > ?",
        )
        .bind(kind.key(value))
        .bind(now_ms())
        .fetch_optional(&self.pool)
        .await?;
        Ok(payload)
    }
}

#[async_trait]
impl TransientStore for SqlTransientStore {
    async fn put_state(&self, state: &str, ttl: Duration) -> Result<(), StoreError> {
        self.insert(EntryKind::State, state, None, "", ttl).await
    }

    async fn take_state(&self, state: &str) -> Result<bool, StoreError> {
        Ok(self.take(EntryKind::State, state).await?.is_some())
    }

    async fn put_exchange_code(
        &self,
        code: &str,
        identity: &ExternalIdentity,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(identity)?;
        self.insert(EntryKind::ExchangeCode, code, Some(&identity.id), &payload, ttl)
            .await
    }

    async fn take_exchange_code(&self, code: &str) -> Result<Option<ExternalIdentity>, StoreError> {
        match self.take(EntryKind::ExchangeCode, code).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
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
        self.insert(EntryKind::for_token(kind), token, Some(&record.user_id), &payload, ttl)
            .await
    }

    async fn get_token(&self, kind: TokenKind, token: &str) -> Result<Option<StoredToken>, StoreError> {
        match self.get(EntryKind::for_token(kind), token).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn take_token(&self, kind: TokenKind, token: &str) -> Result<Option<StoredToken>, StoreError> {
        match self.take(EntryKind::for_token(kind), token).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn delete_token(&self, kind: TokenKind, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM transient_entries WHERE key = ?")
            .bind(EntryKind::for_token(kind).key(token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_subject_tokens(&self, user_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM transient_entries WHERE subject = ? AND kind IN (?, ?)",
        )
        .bind(user_id)
        .bind(EntryKind::AccessToken.as_str())
        .bind(EntryKind::RefreshToken.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn blacklist(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        self.insert(EntryKind::Blacklist, token, None, "", ttl).await
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.get(EntryKind::Blacklist, token).await?.is_some())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM transient_entries WHERE expires_at_ms <= ?")
            .bind(now_ms())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
