//! OAuth提供商插件层

pub mod r#trait;
pub mod google;

// 重新导出
pub use r#trait::{IdentityProvider, ProviderError};
pub use google::GoogleProvider;
