// src/core/cursor.rs

//! The cursor table: server-held result streams paged by clients across requests.
//!
//! Ids come from a process-wide counter starting at 0 and are never reused. An
//! exhausted cursor stays in the table and keeps answering with empty pages. The
//! only way an entry leaves is idle eviction, which is off unless configured.

use crate::core::backend::{BackendError, DocumentStream};
use crate::core::metrics;
use crate::core::protocol::Document;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

pub type CursorId = u64;

/// The page size used when a request does not ask for one.
pub const DEFAULT_BATCH_SIZE: usize = 15;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CursorError {
    #[error("couldn't find the cursor with id {0}")]
    NotFound(CursorId),

    #[error(transparent)]
    Stream(#[from] BackendError),
}

/// One page pulled from a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: CursorId,
    pub results: Vec<Document>,
    /// True once the underlying stream has reported its end.
    pub exhausted: bool,
}

struct CursorEntry {
    stream: Box<dyn DocumentStream>,
    exhausted: bool,
    last_access: Instant,
}

/// The process-wide table of open cursors.
#[derive(Default)]
pub struct CursorTable {
    next_id: AtomicU64,
    cursors: DashMap<CursorId, Arc<Mutex<CursorEntry>>>,
}

impl CursorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a stream and returns its new id.
    pub fn open(&self, stream: Box<dyn DocumentStream>) -> CursorId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = CursorEntry {
            stream,
            exhausted: false,
            last_access: Instant::now(),
        };
        self.cursors.insert(id, Arc::new(Mutex::new(entry)));
        metrics::OPEN_CURSORS.set(self.cursors.len() as f64);
        debug!("Opened cursor {}", id);
        id
    }

    /// Pulls up to `batch_size` documents from cursor `id`.
    ///
    /// Stops early without error when the stream ends. A stream failure is returned
    /// as `CursorError::Stream`; documents pulled before the failure are discarded.
    pub async fn page(&self, id: CursorId, batch_size: usize) -> Result<Page, CursorError> {
        // Clone the handle out so the map shard is not held across awaits.
        let entry = self
            .cursors
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(CursorError::NotFound(id))?;

        let mut entry = entry.lock().await;
        entry.last_access = Instant::now();
        let mut results = Vec::with_capacity(batch_size.min(1024));
        while !entry.exhausted && results.len() < batch_size {
            match entry.stream.next().await? {
                Some(doc) => results.push(doc),
                None => entry.exhausted = true,
            }
        }
        Ok(Page {
            id,
            results,
            exhausted: entry.exhausted,
        })
    }

    pub fn contains(&self, id: CursorId) -> bool {
        self.cursors.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Drops cursors untouched for longer than `max_idle`. Cursors currently being
    /// paged are skipped. Returns the number evicted.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.cursors.len();
        self.cursors.retain(|_, entry| match entry.try_lock() {
            Ok(guard) => guard.last_access.elapsed() <= max_idle,
            Err(_) => true,
        });
        let evicted = before.saturating_sub(self.cursors.len());
        metrics::OPEN_CURSORS.set(self.cursors.len() as f64);
        evicted
    }
}
