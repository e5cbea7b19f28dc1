//! HTTP服务器启动
//!
//! Shared tower stack and serve loop for both the auth service and the gateway.

use axum::{error_handling::HandleErrorLayer, http::StatusCode, response::IntoResponse, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::cors::create_cors_layer;
use super::response::error_response;
use super::server_config::*;

/// Wrap `router` in the common middleware stack
///
/// Order (outer → inner): CORS, error mapping, concurrency, body limit, timeout, tracing.
pub fn apply_middleware(router: Router, cors_origin: &str, max_body: usize) -> anyhow::Result<Router> {
    let cors = create_cors_layer(cors_origin).map_err(anyhow::Error::msg)?;

    Ok(router
        .layer(
            ServiceBuilder::new()
                // Convert middleware errors (timeout/overload) into HTTP responses
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENCY))
                .layer(RequestBodyLimitLayer::new(max_body))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(TraceLayer::new_for_http()),
        )
        .layer(cors))
}

async fn handle_middleware_error(err: BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        error_response(StatusCode::REQUEST_TIMEOUT, "REQUEST_TIMEOUT", "Request timed out")
    } else {
        error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Service overloaded",
        )
    }
}

/// Bind and serve until `shutdown` fires or the process receives Ctrl-C / SIGTERM
pub async fn serve(app: Router, addr: &str, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = shutdown_signal() => shutdown.cancel(),
            }
            tracing::info!("Shutdown signal received, draining connections");
        })
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
