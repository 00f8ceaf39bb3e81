//! netmatch-server - Networking submission intake service
//!
//! Accepts attendee form submissions, keeps them in a durable snapshot, and
//! drives the external scoring unit that produces match recommendations.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use netmatch_common::config::{load_toml_config, resolve_config_path, TomlConfig};
use netmatch_server::config::{Args, Config};
use netmatch_server::services::{ComputationInvoker, MatchingOrchestrator, SubmissionStore};
use netmatch_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config file is read before tracing so its log level can apply
    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path),
        None => Ok(TomlConfig::default()),
    };
    let log_level = toml_config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "netmatch_server={0},netmatch_common={0},tower_http={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting netmatch-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let toml_config = toml_config.context("Failed to load config file")?;
    match config_path.as_ref().filter(|p| p.exists()) {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let config = Config::resolve(&args, &toml_config);
    info!("Data folder: {}", config.data_folder.display());

    // A corrupt snapshot halts startup instead of being reset
    let store = match SubmissionStore::open_in(&config.data_folder).await {
        Ok(store) => {
            info!("✓ Submission store ready ({} records)", store.len().await);
            store
        }
        Err(e) => {
            error!("Failed to open submission store: {}", e);
            return Err(e).context("Failed to open submission store");
        }
    };

    let invoker = config.invoker();
    info!(
        "Scoring unit: {} (timeout {}s, max {} concurrent)",
        invoker.command_line(),
        invoker.timeout().as_secs(),
        invoker.max_concurrent()
    );
    let invoker: Arc<dyn ComputationInvoker> = Arc::new(invoker);

    let orchestrator = MatchingOrchestrator::new(Arc::new(store), invoker);
    let app = build_router(AppState::new(orchestrator));

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("Listening on http://{}", address);
    info!("Health check: http://{}/api/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
