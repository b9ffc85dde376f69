// src/core/registry.rs

//! The named connection registry.
//!
//! Clients refer to backend connections by name. The first successful connect for
//! a name wins: later requests for the same name reuse the cached handle and ignore
//! whatever address they carry. Entries are never evicted.

use crate::core::backend::{Backend, BackendConnection};
use crate::core::metrics;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The host used when an address omits one.
pub const DEFAULT_HOST: &str = "localhost";
/// The port used when an address omits one or carries an unusable one.
pub const DEFAULT_PORT: u16 = 27017;

/// A backend server address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `host[:port]`, optionally prefixed by `mongodb://` and followed by a
    /// path. A missing or malformed port falls back to the default port.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let text = text.strip_prefix("mongodb://").unwrap_or(text);
        let text = text.split('/').next().unwrap_or_default();
        if text.is_empty() {
            return Self::default();
        }
        let (host, port) = match text.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().unwrap_or(DEFAULT_PORT)),
            None => (text, DEFAULT_PORT),
        };
        let host = if host.is_empty() { DEFAULT_HOST } else { host };
        Self::new(host, port)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Why a name could not be resolved to a connection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectError {
    /// The name is unknown and no address was supplied to create it.
    #[error("no connection named '{0}' and no server given")]
    MissingAddress(String),

    /// The backend could not be reached at the given address.
    #[error("could not connect to {address}: {reason}")]
    Unreachable { address: ServerAddress, reason: String },
}

/// A named, cached connection.
#[derive(Clone)]
pub struct RegisteredConnection {
    pub name: String,
    pub address: ServerAddress,
    pub handle: Arc<dyn BackendConnection>,
}

impl fmt::Debug for RegisteredConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredConnection")
            .field("name", &self.name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Maps connection names to live backend connections.
pub struct ConnectionRegistry {
    backend: Arc<dyn Backend>,
    connections: DashMap<String, RegisteredConnection>,
    /// Serializes connects per name so concurrent requests for a new name settle on
    /// one handle. Different names never wait on each other.
    connect_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConnectionRegistry {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            connections: DashMap::new(),
            connect_locks: DashMap::new(),
        }
    }

    fn connect_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.connect_locks
            .entry(name.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Returns the cached connection for `name`, if any.
    pub fn get(&self, name: &str) -> Option<RegisteredConnection> {
        self.connections.get(name).map(|entry| entry.value().clone())
    }

    /// Resolves `name` to a connection, connecting to `server` if the name is new.
    ///
    /// A cache hit ignores `server`. On a miss without `server` this fails with
    /// `ConnectError::MissingAddress`.
    pub async fn resolve(
        &self,
        name: &str,
        server: Option<&str>,
    ) -> Result<RegisteredConnection, ConnectError> {
        if let Some(existing) = self.get(name) {
            return Ok(existing);
        }
        let Some(server) = server else {
            return Err(ConnectError::MissingAddress(name.to_string()));
        };
        let address = ServerAddress::parse(server);

        let lock = self.connect_lock(name);
        let _guard = lock.lock().await;
        if let Some(existing) = self.get(name) {
            return Ok(existing);
        }

        let handle = self.backend.connect(&address).await.map_err(|e| {
            warn!("Could not connect '{}' to {}: {}", name, address, e);
            ConnectError::Unreachable {
                address: address.clone(),
                reason: e.to_string(),
            }
        })?;

        let registered = RegisteredConnection {
            name: name.to_string(),
            address,
            handle,
        };
        self.connections
            .insert(name.to_string(), registered.clone());
        metrics::REGISTERED_CONNECTIONS.set(self.connections.len() as f64);
        info!(
            "Registered connection '{}' to {}",
            registered.name, registered.address
        );
        Ok(registered)
    }

    /// Replaces the handle of an existing entry with a fresh connection to the same address.
    /// Used after a connectivity failure; the entry keeps its name and address.
    pub async fn reconnect(&self, name: &str) -> Result<RegisteredConnection, ConnectError> {
        let Some(current) = self.get(name) else {
            return Err(ConnectError::MissingAddress(name.to_string()));
        };
        let lock = self.connect_lock(name);
        let _guard = lock.lock().await;
        let handle = self
            .backend
            .connect(&current.address)
            .await
            .map_err(|e| ConnectError::Unreachable {
                address: current.address.clone(),
                reason: e.to_string(),
            })?;
        let refreshed = RegisteredConnection { handle, ..current };
        self.connections.insert(name.to_string(), refreshed.clone());
        info!("Reconnected '{}' to {}", name, refreshed.address);
        Ok(refreshed)
    }

    /// Every registered name with its `host:port`, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().address.to_string()))
            .collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
