//! API接口层

pub mod handlers;
pub mod routes;
pub mod validators;

pub use handlers::bearer_token;
pub use routes::{create_auth_routes, AuthState};
