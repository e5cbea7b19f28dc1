// src/main.rs
//! Session gate entry point
//! Runs either the auth service or the API gateway.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use session_gate::api::{apply_middleware, serve, server_config::MAX_AUTH_BODY_SIZE, server_config::MAX_BODY_SIZE};
use session_gate::auth::{
    config::AuthConfig, create_auth_routes, providers::GoogleProvider, storage, AuthService,
};
use session_gate::gateway::{create_gateway_routes, AuthClient, GatewayConfig, Upstreams};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "session-gate")]
#[command(about = "OAuth2 session service and API gateway")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the auth service
    Auth {
        /// Overrides PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Start the API gateway
    Gateway {
        /// Overrides GATEWAY_PORT
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging()?;

    info!("Starting session-gate v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Commands::Auth { port } => run_auth(port).await,
        Commands::Gateway { port } => run_gateway(port).await,
    }
}

async fn run_auth(port: Option<u16>) -> Result<()> {
    let mut config = AuthConfig::from_env().context("Invalid auth service configuration")?;
    if let Some(port) = port {
        config.port = port;
    }

    let store = storage::open_store(&config.store.database_url)
        .await
        .context("Failed to open transient store")?;
    let provider = Arc::new(GoogleProvider::new(config.google.clone())?);
    let service = Arc::new(AuthService::from_config(&config, provider, store.clone())?);

    let shutdown = CancellationToken::new();
    let cleanup = storage::spawn_cleanup(store, config.store.cleanup_interval, shutdown.clone());

    let app = apply_middleware(
        create_auth_routes(service, &config.frontend_url),
        &config.cors_origin,
        MAX_AUTH_BODY_SIZE,
    )?;

    let addr = format!("{}:{}", config.host, config.port);
    info!(
        "Auth service: access TTL {}s, refresh TTL {}s, strict rotation {}",
        config.session.access_ttl.as_secs(),
        config.session.refresh_ttl.as_secs(),
        config.session.strict_rotation
    );
    let result = serve(app, &addr, shutdown.clone()).await;

    shutdown.cancel();
    if let Err(e) = cleanup.await {
        tracing::warn!("cleanup task ended abnormally: {}", e);
    }
    result
}

async fn run_gateway(port: Option<u16>) -> Result<()> {
    let mut config = GatewayConfig::from_env().context("Invalid gateway configuration")?;
    if let Some(port) = port {
        config.port = port;
    }

    let validator = Arc::new(AuthClient::new(&config.auth_service_url, config.validate_timeout)?);
    let upstreams = Upstreams::from_config(&config)?;
    let app = apply_middleware(
        create_gateway_routes(upstreams, validator),
        &config.cors_origin,
        MAX_BODY_SIZE,
    )?;

    let addr = format!("{}:{}", config.host, config.port);
    info!("Gateway forwarding auth to {}", config.auth_service_url);
    serve(app, &addr, CancellationToken::new()).await
}

fn init_logging() -> Result<()> {
    let default_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&default_level));

    tracing::subscriber::set_global_default(build_subscriber(filter))?;
    Ok(())
}

/// `LOG_LEVEL` for our crates, quieter defaults for chatty dependencies
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("{},hyper=info,h2=info,sqlx=warn", level))
}

// The filter alone decides what is emitted
fn build_subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync {
    FmtSubscriber::builder().with_env_filter(filter).finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;
    use tracing::Subscriber;

    #[test]
    fn test_log_level_bounds_subscriber() {
        assert_eq!(
            build_subscriber(default_filter("info")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
        assert_eq!(
            build_subscriber(EnvFilter::new("warn")).max_level_hint(),
            Some(LevelFilter::WARN)
        );
    }
}
