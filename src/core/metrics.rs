// src/core/metrics.rs

//! Defines and registers Prometheus metrics for gateway monitoring.
//!
//! Metrics are registered once, globally, through `lazy_static`.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, HistogramVec, TextEncoder, register_counter,
    register_counter_vec, register_gauge, register_histogram_vec,
};

lazy_static! {
    // --- Gauges ---
    /// Cursors currently held in the cursor table.
    pub static ref OPEN_CURSORS: Gauge =
        register_gauge!("docgate_open_cursors", "Number of cursors currently held.").unwrap();
    /// Named connections currently in the registry.
    pub static ref REGISTERED_CONNECTIONS: Gauge =
        register_gauge!("docgate_registered_connections", "Number of named backend connections.").unwrap();
    /// HTTP requests currently being served.
    pub static ref IN_FLIGHT_REQUESTS: Gauge =
        register_gauge!("docgate_in_flight_requests", "Number of HTTP requests being served.").unwrap();

    // --- Counters ---
    /// Operations dispatched, labeled by operation name.
    pub static ref OPERATIONS_TOTAL: CounterVec =
        register_counter_vec!("docgate_operations_total", "Total number of operations dispatched.", &["operation"]).unwrap();
    /// Operations that answered with an `ok: 0` envelope, labeled by operation name.
    pub static ref OPERATION_FAILURES_TOTAL: CounterVec =
        register_counter_vec!("docgate_operation_failures_total", "Total number of failed operations.", &["operation"]).unwrap();
    /// Requests whose path did not resolve to an operation.
    pub static ref UNROUTED_REQUESTS_TOTAL: Counter =
        register_counter!("docgate_unrouted_requests_total", "Total number of requests for unknown paths.").unwrap();
    /// Cursors dropped by the idle reaper.
    pub static ref CURSORS_EVICTED_TOTAL: Counter =
        register_counter!("docgate_cursors_evicted_total", "Total number of idle cursors evicted.").unwrap();

    // --- Histograms ---
    /// Operation latency, labeled by operation name.
    pub static ref OPERATION_LATENCY_SECONDS: HistogramVec =
        register_histogram_vec!("docgate_operation_latency_seconds", "Latency of operation processing in seconds.", &["operation"]).unwrap();
}

/// Gathers all registered metrics and encodes them in the Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
