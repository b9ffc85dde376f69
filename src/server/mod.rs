// src/server/mod.rs

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, reload};

mod connection_loop;
mod context;
pub mod http;
pub mod initialization;
mod metrics_server;
mod spawner;

/// The handle used to change the log filter once the configuration is known.
pub type LogReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// The main server startup function, orchestrating all setup phases.
pub async fn run(config: Config, log_reload_handle: Arc<LogReloadHandle>) -> Result<()> {
    // The configured level applies unless RUST_LOG was set explicitly.
    if std::env::var("RUST_LOG").is_err() {
        match EnvFilter::try_new(&config.log_level) {
            Ok(filter) => {
                if let Err(e) = log_reload_handle.reload(filter) {
                    warn!("Could not apply log level '{}': {}", config.log_level, e);
                }
            }
            Err(e) => warn!("Invalid log level '{}': {}", config.log_level, e),
        }
    }
    info!("Starting docgate {}", env!("CARGO_PKG_VERSION"));

    // 1. Initialize gateway state, backends and the listener.
    let mut server_context = initialization::setup(config).await?;

    // 2. Spawn all background tasks.
    spawner::spawn_all(&mut server_context);

    // 3. Serve requests until shutdown.
    connection_loop::run(server_context).await
}
