//! Gantry Server
//!
//! Webhook-driven autoscaler for ephemeral CI runners.
//!
//! Architecture:
//! - Configuration: load settings from environment or defaults
//! - Providers: Docker runner provider and GitHub credential broker,
//!   constructed once and shared by every provisioning task
//! - API: heartbeat plus the authenticated webhook gates
//! - Provisioning: one background admission loop per queued job
//!
//! The server acknowledges each webhook immediately; provisioning runs
//! as tracked background tasks that are drained (with a bound) on
//! shutdown.

mod api;
mod config;
mod provision;
mod state;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::state::AppState;
use gantry_docker::DockerClient;
use gantry_github::GithubClient;

/// How long shutdown waits for in-flight provisioning tasks
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    // Initialize tracing
    let default_filter = if config.debug {
        "gantry_server=debug,tower_http=debug"
    } else {
        "gantry_server=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gantry autoscaler (env: {})", config.env);

    // Initialize the runner provider; build/pull failures are fatal.
    let provider = DockerClient::initialize(&config.docker)
        .context("Failed to initialize the Docker runner provider")?;
    info!(
        "Docker provider initialized (image: {}, enabled: {})",
        provider.image_ref(),
        provider.is_enabled()
    );

    let broker = GithubClient::with_base_url(&config.github_token, &config.github_api_url);
    info!("GitHub client initialized ({})", broker.base_url());

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, Arc::new(provider), Arc::new(broker));
    let app = api::create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;

    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down");
    state.drain(DRAIN_TIMEOUT).await;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
