// src/core/state/core.rs

//! Defines the central `GatewayState` struct, holding all shared gateway-wide state.

use super::stats::StatsState;
use crate::config::Config;
use crate::core::backend::{Backend, MemoryBackend};
use crate::core::cursor::CursorTable;
use crate::core::registry::{ConnectionRegistry, ServerAddress};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

/// The state every request handler shares.
///
/// Wrapped in an `Arc` and handed to the HTTP layer and background tasks. The
/// connection registry and the cursor table are the only mutable shared state;
/// both synchronize internally.
pub struct GatewayState {
    /// The configuration the gateway was started with.
    pub config: Config,
    /// Named backend connections.
    pub registry: ConnectionRegistry,
    /// Open server-side cursors.
    pub cursors: CursorTable,
    pub stats: StatsState,
    /// Bounds the number of requests served at once to `config.max_clients`.
    pub request_permits: Arc<Semaphore>,
}

impl GatewayState {
    /// Creates the state around an existing backend.
    pub fn new(config: Config, backend: Arc<dyn Backend>) -> Self {
        let request_permits = Arc::new(Semaphore::new(config.max_clients));
        Self {
            registry: ConnectionRegistry::new(backend),
            cursors: CursorTable::new(),
            stats: StatsState::new(),
            request_permits,
            config,
        }
    }

    /// Creates the state together with the backend described by `config.backend`.
    pub fn initialize(config: Config) -> Self {
        let backend = build_backend(&config);
        Self::new(config, backend)
    }

    /// The page size used when a request does not pass one.
    pub fn default_batch_size(&self) -> usize {
        self.config.cursors.default_batch_size
    }
}

fn build_backend(config: &Config) -> Arc<dyn Backend> {
    match config.backend.kind {
        crate::config::BackendKind::Memory => {
            if config.backend.reachable.is_empty() {
                info!("Using the embedded memory backend.");
                Arc::new(MemoryBackend::new())
            } else {
                info!(
                    "Using the embedded memory backend, reachable at: {}",
                    config.backend.reachable.join(", ")
                );
                Arc::new(MemoryBackend::with_reachable(
                    config.backend.reachable.iter().map(|a| ServerAddress::parse(a)),
                ))
            }
        }
    }
}
