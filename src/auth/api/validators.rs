//! API请求validate器
//!
//! Shape checks only. Anything passing here still goes through full
//! verification in the service.

use crate::auth::errors::AuthError;

/// Minimum length of a session token
pub const MIN_TOKEN_LEN: usize = 20;
/// Minimum length of an exchange code or provider authorization code
pub const MIN_CODE_LEN: usize = 10;

/// validate会话token
pub fn validate_token(field: &str, token: &str) -> Result<(), AuthError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidRequest(format!("{} is required", field)));
    }
    if token.len() < MIN_TOKEN_LEN {
        return Err(AuthError::InvalidRequest(format!("{} is too short", field)));
    }
    Ok(())
}

/// validate授权码
pub fn validate_code(field: &str, code: &str) -> Result<(), AuthError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AuthError::InvalidRequest(format!("{} is required", field)));
    }
    if code.len() < MIN_CODE_LEN {
        return Err(AuthError::InvalidRequest(format!("{} is too short", field)));
    }
    Ok(())
}
