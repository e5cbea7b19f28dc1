//! CORS 中间件配置
//!
//! 提供跨域资源共享配置

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::server_config::CORS_MAX_AGE;

/// 创建 CORS 层
///
/// # Arguments
/// * `cors_origin` - 允许的源（可以是逗号分隔的列表）
///
/// # Errors
/// Returns the offending entry when an origin is not a valid header value.
pub fn create_cors_layer(cors_origin: &str) -> Result<CorsLayer, String> {
    let origins = cors_origin
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| HeaderValue::from_str(s).map_err(|_| format!("invalid CORS origin: {:?}", s)))
        .collect::<Result<Vec<HeaderValue>, String>>()?;

    let allow_origin = match origins.len() {
        0 => return Err("CORS_ALLOW_ORIGIN is empty".to_string()),
        1 => AllowOrigin::exact(origins[0].clone()),
        _ => AllowOrigin::list(origins),
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
            Method::PUT,
            Method::PATCH,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            header::ACCESS_CONTROL_REQUEST_METHOD,
            header::ACCESS_CONTROL_REQUEST_HEADERS,
        ])
        .expose_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE))
}
