//! API网关
//!
//! ## 架构设计
//!
//! ```text
//! gateway/
//! ├── config.rs       # GatewayConfig
//! ├── client.rs       # TokenValidator + HTTP AuthClient
//! ├── middleware.rs   # require_auth / optional_auth
//! ├── proxy.rs        # upstream forwarder
//! ├── trusted.rs      # X-User-ID extractor for downstream services
//! └── routes.rs       # router
//! ```

pub mod client;
pub mod config;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod trusted;

// 重新导出
pub use client::{AuthClient, GatewayError, TokenValidator};
pub use config::GatewayConfig;
pub use middleware::{optional_auth, require_auth, AuthenticatedUser, GateState};
pub use routes::{create_gateway_routes, Upstreams};
pub use trusted::{TrustedUser, USER_EMAIL_HEADER, USER_ID_HEADER};
