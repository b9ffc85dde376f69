// src/server/connection_loop.rs

//! Runs the HTTP server until a signal arrives, then shuts everything down gracefully.

use super::context::ServerContext;
use super::http;
use anyhow::{Result, anyhow};
use std::future::IntoFuture;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, error, info, warn};

/// How long in-flight requests and background tasks get to finish on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Serves requests and handles graceful shutdown.
pub async fn run(mut ctx: ServerContext) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow!("Failed to register SIGINT handler: {}", e))?;
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow!("Failed to register SIGTERM handler: {}", e))?;

    let app = http::router(ctx.state.clone());
    let mut server_shutdown_rx = ctx.shutdown_tx.subscribe();
    let mut server_task = tokio::spawn(
        axum::serve(ctx.listener, app)
            .with_graceful_shutdown(async move {
                server_shutdown_rx.recv().await.ok();
            })
            .into_future(),
    );
    let mut server_finished = false;

    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = &mut server_task => {
                server_finished = true;
                match res {
                    Ok(Ok(())) => warn!("HTTP server stopped unexpectedly."),
                    Ok(Err(e)) => error!("CRITICAL: HTTP server failed: {}", e),
                    Err(e) => error!("CRITICAL: HTTP server task panicked: {e:?}"),
                }
                break;
            }
        }
    }

    info!("Shutting down. Sending signal to all tasks.");
    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No task was listening for the shutdown signal.");
    }

    if !server_finished {
        info!("Waiting for in-flight requests to finish...");
        if tokio::time::timeout(SHUTDOWN_GRACE, server_task).await.is_err() {
            warn!("Timed out waiting for in-flight requests to finish.");
        }
    }

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(SHUTDOWN_GRACE, async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!(
        "Server shutdown complete after {} requests ({} operations, {} failed).",
        ctx.state.stats.requests(),
        ctx.state.stats.operations(),
        ctx.state.stats.failed_operations()
    );
    Ok(())
}
