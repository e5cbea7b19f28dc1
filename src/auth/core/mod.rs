//! 核心业务逻辑层

pub mod token_service;

// 重新导出
pub use token_service::{TokenError, TokenService, VerifiedToken};
