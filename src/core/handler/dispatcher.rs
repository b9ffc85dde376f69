// src/core/handler/dispatcher.rs

//! Dispatches a routed call to its operation and turns the outcome into a reply.
//!
//! Dispatch never fails: an operation error becomes an `ok: 0` envelope. Batch
//! entries go through the same path, so they are logged and counted like
//! top-level requests.

use super::args::Args;
use super::reply::Reply;
use super::router::Route;
use crate::core::GatewayError;
use crate::core::metrics;
use crate::core::operations::{Operation, OperationContext};
use crate::core::state::GatewayState;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info_span};

/// The connection used when a request does not name one.
pub const DEFAULT_CONNECTION: &str = "default";

/// A request resolved to an operation, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedCall {
    /// The registry name of the connection to use, from the `name` argument.
    pub connection: String,
    pub db: Option<String>,
    pub collection: Option<String>,
    pub operation: Operation,
    pub args: Args,
}

impl RoutedCall {
    /// Builds a call from explicit parts.
    pub fn new(
        operation: Operation,
        db: Option<String>,
        collection: Option<String>,
        args: Args,
    ) -> Self {
        let connection = args.get("name").unwrap_or(DEFAULT_CONNECTION).to_string();
        Self {
            connection,
            db,
            collection,
            operation,
            args,
        }
    }

    /// Builds a call from a routed path. Fails when the path names no known operation.
    pub fn from_route(route: Route, args: Args) -> Result<Self, GatewayError> {
        let operation = Operation::from_str(&route.operation)
            .map_err(|_| GatewayError::UnknownOperation(route.operation.clone()))?;
        Ok(Self::new(
            operation,
            Some(route.db),
            route.collection,
            args,
        ))
    }
}

/// Runs routed calls against the shared gateway state.
#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<GatewayState>,
}

impl Dispatcher {
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    /// Runs `call` and returns its reply.
    pub async fn dispatch(&self, call: &RoutedCall) -> Reply {
        let name = call.operation.name();
        let span = info_span!(
            "operation",
            name = %name,
            db = call.db.as_deref().unwrap_or(""),
            collection = call.collection.as_deref().unwrap_or(""),
            connection = %call.connection,
        );

        async move {
            let start_time = Instant::now();
            metrics::OPERATIONS_TOTAL.with_label_values(&[name]).inc();

            let ctx = OperationContext {
                state: &self.state,
                call,
            };
            let reply = match call.operation.execute(&ctx).await {
                Ok(reply) => reply,
                Err(e) => {
                    debug!("Operation failed: {}", e);
                    Reply::Envelope(e.into_envelope())
                }
            };

            let failed = reply.is_failure();
            if failed {
                metrics::OPERATION_FAILURES_TOTAL
                    .with_label_values(&[name])
                    .inc();
            }
            self.state.stats.record_operation(failed);
            metrics::OPERATION_LATENCY_SECONDS
                .with_label_values(&[name])
                .observe(start_time.elapsed().as_secs_f64());
            reply
        }
        .instrument(span)
        .await
    }
}
