//! OAuth2 login → session token exchange, token lifecycle, and the API
//! gateway gate that enforces it.

pub mod api;
pub mod auth;
pub mod gateway;
