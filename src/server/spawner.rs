// src/server/spawner.rs

//! Spawns the gateway's long-running background tasks.

use super::context::ServerContext;
use super::metrics_server;
use crate::core::tasks::cursor_reaper::CursorReaperTask;
use tracing::info;

/// Spawns all background tasks into the context's JoinSet.
pub fn spawn_all(ctx: &mut ServerContext) {
    let state = &ctx.state;
    let shutdown_tx = &ctx.shutdown_tx;
    let background_tasks = &mut ctx.background_tasks;

    // --- Metrics Server ---
    if state.config.metrics.enabled {
        let metrics_state = state.clone();
        let shutdown_rx_metrics = shutdown_tx.subscribe();
        background_tasks.spawn(async move {
            metrics_server::run_metrics_server(metrics_state, shutdown_rx_metrics).await
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }

    // --- Cursor Maintenance ---
    if state.config.cursors.idle_timeout_secs > 0 {
        let reaper = CursorReaperTask::new(state.clone());
        let shutdown_rx_reaper = shutdown_tx.subscribe();
        background_tasks.spawn(async move {
            reaper.run(shutdown_rx_reaper).await;
            Ok(())
        });
    }

    info!("All background tasks have been spawned.");
}
