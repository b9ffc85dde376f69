// src/server/initialization.rs

//! Builds the gateway state, connects the configured backends and binds the listener.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::handler::dispatcher::DEFAULT_CONNECTION;
use crate::core::state::GatewayState;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let state = Arc::new(GatewayState::initialize(config));
    info!("Gateway state initialized.");

    preconnect_backends(&state).await;

    let listener = TcpListener::bind((state.config.host.as_str(), state.config.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                state.config.host, state.config.port
            )
        })?;
    info!(
        "docgate listening on http://{}:{}",
        state.config.host, state.config.port
    );

    Ok(ServerContext {
        state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// The registry name for a backend given at startup. A lone backend is the
/// default connection; with several, each is named after its address.
pub fn startup_connection_name(address: &str, backend_count: usize) -> String {
    if backend_count == 1 {
        DEFAULT_CONNECTION.to_string()
    } else {
        address.chars().filter(|c| *c != '.' && *c != ':').collect()
    }
}

/// Connects every configured backend concurrently. A backend that cannot be
/// reached is logged and skipped; the gateway still starts.
pub async fn preconnect_backends(state: &GatewayState) {
    let backends = &state.config.backends;
    let attempts = backends.iter().map(|address| async move {
        let name = startup_connection_name(address, backends.len());
        if let Err(e) = state.registry.resolve(&name, Some(address.as_str())).await {
            warn!("Startup connection '{}' failed: {}", name, e);
        }
    });
    join_all(attempts).await;
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Configured backends: {}",
        if config.backends.is_empty() {
            "(none)".to_string()
        } else {
            config.backends.join(", ")
        }
    );
    info!(
        "Default batch size {}, at most {} concurrent requests.",
        config.cursors.default_batch_size, config.max_clients
    );
    if config.cross_origin {
        info!("Cross-origin requests are allowed.");
    }
}
