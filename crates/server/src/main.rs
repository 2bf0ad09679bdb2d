use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kaistream_core::{
    load_config, validate_config, HttpProviderFactory, NyaaClient, Resolver, SessionStore,
    TorrentFinder,
};
use kaistream_server::{api::create_router, metrics, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("KAISTREAM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Torrent index: {} (uploader {})", config.nyaa.base_url, config.nyaa.uploader);

    // Debrid adapters are built per request from session credentials
    let factory = HttpProviderFactory::new(config.providers.clone())
        .context("Failed to create debrid HTTP client")?;
    let resolver = Arc::new(Resolver::new(config.resolver.clone(), Arc::new(factory)));

    // Torrent index
    let nyaa = Arc::new(NyaaClient::new(config.nyaa.clone()).context("Failed to create Nyaa client")?);
    let finder = TorrentFinder::new(
        nyaa.clone(),
        nyaa,
        config.nyaa.max_parallel_fetches,
    );

    // Sessions
    let sessions = SessionStore::new(config.sessions.ttl_secs);
    let sweep_handle = spawn_session_sweeper(
        sessions.clone(),
        Duration::from_secs(config.sessions.sweep_interval_secs.max(1)),
    );

    let state = Arc::new(AppState::new(config.clone(), sessions, resolver, finder));
    metrics::collect_dynamic_metrics(&state).await;

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);
    if let Some(public_url) = &config.server.public_url {
        info!("Public URL: {}", public_url);
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    sweep_handle.abort();

    Ok(())
}

/// Periodically drop expired sessions.
fn spawn_session_sweeper(sessions: SessionStore, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // First tick fires immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            sessions.sweep_expired().await;
            metrics::SESSIONS_ACTIVE.set(sessions.len().await as i64);
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
