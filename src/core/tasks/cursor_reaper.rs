// src/core/tasks/cursor_reaper.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::core::metrics;
use crate::core::state::GatewayState;

/// A task that periodically drops cursors no client has paged for a while.
///
/// Only spawned when `cursors.idle_timeout_secs` is non-zero. Without it, cursors
/// live until the process exits.
pub struct CursorReaperTask {
    state: Arc<GatewayState>,
    interval: Duration,
    max_idle: Duration,
}

impl CursorReaperTask {
    pub fn new(state: Arc<GatewayState>) -> Self {
        let interval = Duration::from_secs(state.config.cursors.reap_interval_secs);
        let max_idle = Duration::from_secs(state.config.cursors.idle_timeout_secs);
        Self {
            state,
            interval,
            max_idle,
        }
    }

    /// The main run loop for the reaper task.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            "Cursor reaper task started (idle timeout {:?}, every {:?}).",
            self.max_idle, self.interval
        );
        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = reap_idle_cursors(&self.state, self.max_idle);
                    if evicted > 0 {
                        info!("Evicted {} idle cursors.", evicted);
                    } else {
                        debug!("No idle cursors to evict.");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Cursor reaper task shutting down.");
                    return;
                }
            }
        }
    }
}

/// Runs one eviction cycle and returns the number of cursors dropped.
pub fn reap_idle_cursors(state: &GatewayState, max_idle: Duration) -> usize {
    let evicted = state.cursors.evict_idle(max_idle);
    metrics::CURSORS_EVICTED_TOTAL.inc_by(evicted as f64);
    evicted
}
