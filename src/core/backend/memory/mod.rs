// src/core/backend/memory/mod.rs

//! An embedded, in-process document backend.
//!
//! Every distinct server address gets its own `ServerNode` holding databases,
//! collections and users. Nodes can be taken offline to simulate a lost server:
//! new connections are refused and every operation on an existing connection,
//! including draining an open cursor, fails with `BackendError::Disconnected`.

use super::{Backend, BackendConnection, BackendError};
use crate::core::protocol::Document;
use crate::core::registry::ServerAddress;
use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

mod commands;
mod connection;
pub mod matcher;
pub mod path;
pub mod query;
pub mod update;

pub use connection::MemoryConnection;

/// One database: its collections in creation order and its users.
#[derive(Debug, Default, Clone)]
pub struct Database {
    pub collections: IndexMap<String, Vec<Document>>,
    pub users: HashMap<String, String>,
}

/// The state of one simulated server.
#[derive(Debug)]
pub struct ServerNode {
    address: ServerAddress,
    online: AtomicBool,
    databases: RwLock<BTreeMap<String, Database>>,
    next_connection_id: AtomicU64,
    /// Bumped whenever existing connections are dropped.
    generation: AtomicU64,
    started: Instant,
}

impl ServerNode {
    fn new(address: ServerAddress) -> Self {
        Self {
            address,
            online: AtomicBool::new(true),
            databases: RwLock::new(BTreeMap::new()),
            next_connection_id: AtomicU64::new(1),
            generation: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn connections_created(&self) -> u64 {
        self.next_connection_id.load(Ordering::Relaxed) - 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Breaks every existing connection. New connections are unaffected.
    pub fn drop_connections(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn ensure_online(&self) -> Result<(), BackendError> {
        if self.is_online() {
            Ok(())
        } else {
            Err(BackendError::Disconnected(self.address.to_string()))
        }
    }

    /// Runs `f` with read access to a collection. A missing collection reads as empty.
    pub(crate) fn read_collection<R>(
        &self,
        db: &str,
        collection: &str,
        f: impl FnOnce(&[Document]) -> R,
    ) -> R {
        let dbs = self.databases.read();
        let docs = dbs
            .get(db)
            .and_then(|d| d.collections.get(collection))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        f(docs)
    }

    /// Runs `f` with write access to a collection, creating it on demand.
    pub(crate) fn write_collection<R>(
        &self,
        db: &str,
        collection: &str,
        f: impl FnOnce(&mut Vec<Document>) -> R,
    ) -> R {
        let mut dbs = self.databases.write();
        let docs = dbs
            .entry(db.to_string())
            .or_default()
            .collections
            .entry(collection.to_string())
            .or_default();
        f(docs)
    }

    pub(crate) fn with_databases<R>(&self, f: impl FnOnce(&BTreeMap<String, Database>) -> R) -> R {
        f(&self.databases.read())
    }

    pub(crate) fn with_databases_mut<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Database>) -> R,
    ) -> R {
        f(&mut self.databases.write())
    }
}

/// The in-memory backend. Cheap to clone handles are obtained through `Arc`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    nodes: DashMap<ServerAddress, Arc<ServerNode>>,
    /// When set, only these addresses accept connections.
    reachable: Option<HashSet<ServerAddress>>,
}

impl MemoryBackend {
    /// A backend that accepts connections to any address.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that only accepts connections to the given addresses.
    pub fn with_reachable(addresses: impl IntoIterator<Item = ServerAddress>) -> Self {
        Self {
            nodes: DashMap::new(),
            reachable: Some(addresses.into_iter().collect()),
        }
    }

    /// Returns the node for `address`, creating it on first use.
    pub fn node(&self, address: &ServerAddress) -> Arc<ServerNode> {
        self.nodes
            .entry(address.clone())
            .or_insert_with(|| Arc::new(ServerNode::new(address.clone())))
            .clone()
    }

    /// Takes a server offline or brings it back.
    pub fn set_online(&self, address: &ServerAddress, online: bool) {
        info!(
            "Memory backend server {} is now {}",
            address,
            if online { "online" } else { "offline" }
        );
        self.node(address).set_online(online);
    }

    /// Simulates losing the server: existing connections and cursors start failing.
    pub fn disconnect(&self, address: &ServerAddress) {
        self.set_online(address, false);
    }

    pub fn reconnect(&self, address: &ServerAddress) {
        self.set_online(address, true);
    }

    /// Simulates a server restart: existing connections and cursors fail, but the
    /// server accepts new connections right away.
    pub fn drop_connections(&self, address: &ServerAddress) {
        info!("Memory backend server {} dropped its connections", address);
        self.node(address).drop_connections();
    }

    fn accepts(&self, address: &ServerAddress) -> bool {
        self.reachable
            .as_ref()
            .is_none_or(|allowed| allowed.contains(address))
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn connect(
        &self,
        address: &ServerAddress,
    ) -> Result<Arc<dyn BackendConnection>, BackendError> {
        if !self.accepts(address) {
            return Err(BackendError::Disconnected(address.to_string()));
        }
        let node = self.node(address);
        node.ensure_online()?;
        let id = node.next_connection_id.fetch_add(1, Ordering::Relaxed);
        debug!("Memory backend accepted connection #{} to {}", id, address);
        Ok(Arc::new(MemoryConnection::new(node, id)))
    }
}
