//! price-relay server entry point.
//!
//! Starts the relay hub, the upstream supervisor, and the Axum server
//! carrying the WebSocket and HTTP endpoints.

use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use price_relay::api::build_app;
use price_relay::app_state::AppState;
use price_relay::config::RelayConfig;
use price_relay::relay::RelayHub;
use price_relay::upstream::{UpstreamSettings, UpstreamSupervisor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RelayConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        mode = %config.delivery_mode,
        "starting price-relay"
    );
    if config.finnhub_token.is_none() {
        tracing::warn!("FINNHUB_TOKEN is not set; the provider will likely reject the connection");
    }

    // Relay hub owns the registry and subscription set
    let (relay, upstream_commands) = RelayHub::spawn(
        config.delivery_mode,
        config.hub_command_capacity,
        config.client_queue_capacity,
    );

    // Provider connection
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let supervisor = UpstreamSupervisor::new(UpstreamSettings::from(&config), relay.clone());
    let upstream_task = tokio::spawn(supervisor.run(upstream_commands, shutdown_tx.subscribe()));

    let app = build_app(AppState { relay });

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    let _ = upstream_task.await;
    tracing::info!("price-relay stopped");

    Ok(())
}

/// Resolves on Ctrl-C and tells the upstream supervisor to close its socket.
async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
    let _ = shutdown_tx.send(());
}
