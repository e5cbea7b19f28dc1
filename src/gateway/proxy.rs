//! Upstream forwarder
//!
//! Forwards the request path and query unchanged to one upstream base URL.
//! Hop-by-hop headers are dropped in both directions. Redirects are relayed,
//! never followed.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::api::response::error_response;
use crate::api::server_config::MAX_BODY_SIZE;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// One upstream service
#[derive(Clone)]
pub struct Upstream {
    inner: Arc<UpstreamInner>,
}

struct UpstreamInner {
    name: &'static str,
    base_url: String,
    http: reqwest::Client,
}

impl Upstream {
    pub fn new(name: &'static str, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        // Upstream redirects (e.g. the login callback) go back to the browser as-is.
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            inner: Arc::new(UpstreamInner {
                name,
                base_url: base_url.trim_end_matches('/').to_string(),
                http,
            }),
        })
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    fn target(&self, req: &Request) -> String {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        format!("{}{}", self.inner.base_url, path_and_query)
    }
}

/// Forward the request to the upstream held in state
pub async fn forward(State(upstream): State<Upstream>, req: Request) -> Response {
    match try_forward(&upstream, req).await {
        Ok(response) => response,
        Err(rejection) => rejection,
    }
}

async fn try_forward(upstream: &Upstream, req: Request) -> Result<Response, Response> {
    let target = upstream.target(&req);
    let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
        .map_err(|_| error_response(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", "Unsupported method"))?;

    let mut outbound = upstream.inner.http.request(method, &target);
    for (name, value) in req.headers() {
        if !is_hop_by_hop(name.as_str()) {
            outbound = outbound.header(name.as_str(), value.as_bytes());
        }
    }

    let body = to_bytes(req.into_body(), MAX_BODY_SIZE).await.map_err(|_| {
        error_response(StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", "Request body too large")
    })?;
    if !body.is_empty() {
        outbound = outbound.body(body);
    }

    debug!("forwarding to {} ({})", upstream.name(), target);
    let upstream_response = outbound.send().await.map_err(|e| {
        warn!("upstream {} unreachable: {}", upstream.name(), e);
        if e.is_timeout() {
            error_response(StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT", "Upstream service timed out")
        } else {
            error_response(StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE", "Upstream service unavailable")
        }
    })?;

    let status = StatusCode::from_u16(upstream_response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let headers: Vec<(HeaderName, HeaderValue)> = upstream_response
        .headers()
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
        .filter_map(|(name, value)| {
            Some((
                HeaderName::from_bytes(name.as_str().as_bytes()).ok()?,
                HeaderValue::from_bytes(value.as_bytes()).ok()?,
            ))
        })
        .collect();

    let bytes = upstream_response.bytes().await.map_err(|e| {
        warn!("upstream {} body read failed: {}", upstream.name(), e);
        error_response(StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE", "Upstream service unavailable")
    })?;

    let mut response = (status, Body::from(bytes)).into_response();
    response.headers_mut().extend(headers);
    Ok(response)
}
