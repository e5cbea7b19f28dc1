//! 存储抽象层
//!
//! Transient auth state with expiry: CSRF states, exchange codes, issued-token
//! records and the revocation blacklist.

pub mod r#trait;
pub mod memory;
pub mod sql;
pub mod cleanup;

// 重新导出
pub use r#trait::{EntryKind, StoreError, TransientStore};
pub use memory::MemoryTransientStore;
pub use sql::SqlTransientStore;
pub use cleanup::spawn_cleanup;

use std::sync::Arc;

/// Open the backend named by `database_url` (`memory` or a SQLite URL)
pub async fn open_store(database_url: &str) -> Result<Arc<dyn TransientStore>, StoreError> {
    if database_url.eq_ignore_ascii_case("memory") {
        tracing::warn!("Using in-process transient store; state is lost on restart");
        return Ok(Arc::new(MemoryTransientStore::new()));
    }
    Ok(Arc::new(SqlTransientStore::connect(database_url).await?))
}
