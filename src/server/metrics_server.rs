// src/server/metrics_server.rs

use crate::core::metrics::{self, gather_metrics};
use crate::core::state::GatewayState;
use anyhow::{Context, Result};
use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Handles HTTP requests to the /metrics endpoint.
///
/// Refreshes the table-size gauges before gathering, so they are exact even if
/// nothing touched the tables since the last scrape.
async fn metrics_handler(state: Arc<GatewayState>) -> impl IntoResponse {
    metrics::OPEN_CURSORS.set(state.cursors.len() as f64);
    metrics::REGISTERED_CONNECTIONS.set(state.registry.len() as f64);

    let body = gather_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        body,
    )
}

/// Runs a simple HTTP server to expose Prometheus metrics on /metrics.
pub async fn run_metrics_server(
    state: Arc<GatewayState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let port = state.config.metrics.port;
    let app = Router::new().route("/metrics", get(move || metrics_handler(state.clone())));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics server on port {port}"))?;
    info!(
        "Prometheus metrics server listening on http://{}/metrics",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_rx.recv().await.ok();
            info!("Metrics server shutting down.");
        })
        .await
        .context("Metrics server failed")
}
