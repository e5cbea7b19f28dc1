//! user认证模块
//!
//! ## 架构设计
//!
//! ```text
//! auth/
//! ├── types.rs          # 类型定义
//! ├── errors.rs         # error类型
//! ├── config.rs         # 配置管理
//! ├── service.rs        # 会话编排（状态机）
//! ├── core/             # 核心业务逻辑层
//! │   └── token_service.rs
//! ├── providers/        # OAuth提供商插件层
//! │   ├── trait.rs
//! │   └── google.rs
//! ├── storage/          # 临时状态存储
//! │   ├── trait.rs
//! │   ├── memory.rs
//! │   ├── sql.rs
//! │   └── cleanup.rs
//! └── api/              # API接口层
//!     ├── routes.rs
//!     ├── handlers.rs
//!     └── validators.rs
//! ```
//!
//! ## Login flow
//!
//! auth URL (state stored) → provider callback (state consumed, identity staged
//! behind a one-time exchange code) → exchange (code consumed, token pair issued)
//! → refresh (pair rotated) → logout (all subject sessions revoked).

pub mod types;
pub mod errors;
pub mod config;
pub mod service;
pub mod core;
pub mod providers;
pub mod storage;
pub mod api;

// 重新导出常用类型和函数
pub use types::{ExternalIdentity, TokenClaims, TokenKind, TokenPair, ValidatedSubject};
pub use errors::AuthError;
pub use config::{AuthConfig, SessionSettings};
pub use service::AuthService;
pub use api::create_auth_routes;
pub use storage::{MemoryTransientStore, SqlTransientStore, TransientStore};
