//! Shared HTTP plumbing

pub mod cors;
pub mod response;
pub mod server;
pub mod server_config; // Server configuration constants

// Re-export commonly used types
pub use response::{error_response, respond, ApiResponse, ErrorBody};
pub use server::{apply_middleware, serve};
