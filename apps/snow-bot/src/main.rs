//! SNOW Bot: Slack Socket Mode client that brings ServiceNow tickets into
//! Slack.
//!
//! Unfurls shared ServiceNow record links, answers a configured reaction
//! with cards for every ticket number in the reacted message, and
//! publishes a small App Home tab.

mod config;
mod dispatch;
mod error;
mod formatter;
mod handlers;
mod slack_client;
mod socket;
mod state;

use std::sync::Arc;

use anyhow::Context;
use snow_core::SnowClient;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("snow_bot=info".parse()?)
                .add_directive("snow_core=info".parse()?),
        )
        .init();

    let config_path = config::config_path().context("Failed to determine config path")?;
    let (server_config, patterns) = config::ServerConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let slack = slack_client::SlackClient::new(server_config.slack.bot_token.clone());
    let snow = SnowClient::new(server_config.servicenow.clone());
    let app_state = Arc::new(state::AppState::new(
        slack.clone(),
        snow,
        patterns,
        server_config.slack.reaction_name(),
        server_config.slack.app_id.clone(),
    ));

    info!(
        host = app_state.snow().host(),
        reaction = app_state.reaction(),
        "Configuration loaded successfully"
    );

    // Graceful shutdown on SIGINT/SIGTERM
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let socket = socket::SocketClient::new(server_config.slack.app_token.clone(), slack);
    let state_for_handler = Arc::clone(&app_state);

    info!(version = state::VERSION, "Starting Socket Mode connection...");
    socket
        .run(
            move |envelope| {
                let state = Arc::clone(&state_for_handler);
                async move {
                    dispatch::dispatch(state, envelope).await;
                }
            },
            shutdown_rx,
        )
        .await
        .context("Socket Mode event loop failed")?;

    info!("Bot shut down cleanly");
    Ok(())
}

/// Resolves on the first SIGINT or SIGTERM.
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            warn!(error = %e, "Cannot register SIGTERM handler, listening for SIGINT only");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("Received SIGINT, shutting down...");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for SIGINT");
        std::future::pending::<()>().await;
    }
    info!("Received SIGINT, shutting down...");
}
