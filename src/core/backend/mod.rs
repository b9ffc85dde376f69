// src/core/backend/mod.rs

//! The capability the gateway consumes from a database backend.
//!
//! The gateway never speaks a wire protocol itself. It talks to a `Backend`, which
//! establishes `BackendConnection`s, which in turn run commands and queries and hand
//! back `DocumentStream`s for cursors to drain.

use crate::core::protocol::{Document, Value};
use crate::core::registry::ServerAddress;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryBackend;

/// The error code a backend reports for a duplicate `_id`.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

/// Errors reported by a backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The connection to the server was lost. Retrying may succeed.
    #[error("connection to {0} lost")]
    Disconnected(String),

    #[error("{message}")]
    DuplicateKey { message: String },

    #[error("{message}")]
    CommandFailed { message: String, code: Option<i32> },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidQuery(String),
}

impl BackendError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BackendError::Disconnected(_))
    }
}

/// Sort direction for one field of a query sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A fully parsed query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub criteria: Document,
    pub fields: Option<Document>,
    pub sort: Vec<(String, SortDirection)>,
    pub skip: u64,
    /// Maximum number of documents to return. `0` means no limit.
    pub limit: u64,
}

/// The result of an update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub upserted: Option<Value>,
}

/// Establishes connections to backend servers.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn connect(
        &self,
        address: &ServerAddress,
    ) -> Result<Arc<dyn BackendConnection>, BackendError>;
}

/// An established connection to one backend server.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    fn address(&self) -> &ServerAddress;

    /// Runs a database command. A command the server rejects is returned as a
    /// document with `ok: 0` rather than as an error.
    async fn run_command(&self, db: &str, command: Document) -> Result<Document, BackendError>;

    async fn authenticate(&self, db: &str, username: &str, password: &str)
    -> Result<(), BackendError>;

    async fn find(
        &self,
        db: &str,
        collection: &str,
        spec: FindSpec,
    ) -> Result<Box<dyn DocumentStream>, BackendError>;

    async fn explain(
        &self,
        db: &str,
        collection: &str,
        spec: FindSpec,
    ) -> Result<Document, BackendError>;

    /// Inserts documents in order, assigning `_id`s where missing. Returns the ids.
    async fn insert(
        &self,
        db: &str,
        collection: &str,
        docs: Vec<Document>,
    ) -> Result<Vec<Value>, BackendError>;

    async fn update(
        &self,
        db: &str,
        collection: &str,
        criteria: Document,
        update: Document,
        upsert: bool,
        multi: bool,
    ) -> Result<UpdateOutcome, BackendError>;

    /// Removes every document matching `criteria`. Returns the number removed.
    async fn remove(
        &self,
        db: &str,
        collection: &str,
        criteria: Document,
    ) -> Result<u64, BackendError>;

    /// The status of the last write issued on this connection against `db`.
    async fn last_status(&self, db: &str) -> Result<Document, BackendError>;
}

/// A forward-only stream of query results.
#[async_trait]
pub trait DocumentStream: Send {
    /// Returns the next document, or `None` once the stream is exhausted.
    async fn next(&mut self) -> Result<Option<Document>, BackendError>;
}
