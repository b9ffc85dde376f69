// src/core/state/stats.rs

//! Request counters reported by `_status`-style introspection and logs.

use std::sync::atomic::{AtomicU64, Ordering};

/// Gateway-wide request statistics.
#[derive(Debug, Default)]
pub struct StatsState {
    requests: AtomicU64,
    operations: AtomicU64,
    failed_operations: AtomicU64,
}

impl StatsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one HTTP request, routed or not.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts one dispatched operation. Batch entries count individually.
    pub fn record_operation(&self, failed: bool) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed_operations.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    pub fn failed_operations(&self) -> u64 {
        self.failed_operations.load(Ordering::Relaxed)
    }
}
