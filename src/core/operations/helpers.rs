// src/core/operations/helpers.rs

//! Argument parsing and backend-failure handling shared by the operations.

use super::OperationContext;
use crate::core::GatewayError;
use crate::core::backend::{BackendConnection, BackendError};
use crate::core::cursor::{CursorError, Page};
use crate::core::handler::args::Method;
use crate::core::protocol::{Document, Value, ext_json};
use std::sync::Arc;
use tracing::warn;

/// Fails unless the call arrived with `expected`.
pub fn require_method(ctx: &OperationContext<'_>, expected: Method) -> Result<(), GatewayError> {
    if ctx.call.args.method() == expected {
        Ok(())
    } else {
        Err(GatewayError::WrongMethod {
            operation: ctx.call.operation.name(),
            expected,
        })
    }
}

/// The database and collection of the call. Both must be present.
pub fn require_namespace(ctx: &OperationContext<'_>) -> Result<(String, String), GatewayError> {
    match (&ctx.call.db, &ctx.call.collection) {
        (Some(db), Some(collection)) => Ok((db.clone(), collection.clone())),
        _ => Err(GatewayError::invalid("db and collection must be defined")),
    }
}

/// Decodes the document argument `key`, if present.
pub fn document_arg(ctx: &OperationContext<'_>, key: &str) -> Result<Option<Document>, GatewayError> {
    ctx.call
        .args
        .get(key)
        .map(ext_json::decode_document)
        .transpose()
        .map_err(Into::into)
}

/// Decodes the document argument `key`, failing with `missing <key>` if it is absent.
pub fn required_document_arg(ctx: &OperationContext<'_>, key: &str) -> Result<Document, GatewayError> {
    document_arg(ctx, key)?.ok_or_else(|| GatewayError::invalid(format!("missing {key}")))
}

/// Parses the integer argument `key`, if present.
pub fn integer_arg(ctx: &OperationContext<'_>, key: &str) -> Result<Option<i64>, GatewayError> {
    ctx.call
        .args
        .get(key)
        .map(|text| {
            text.trim()
                .parse::<i64>()
                .map_err(|_| GatewayError::invalid(format!("{key} must be an integer")))
        })
        .transpose()
}

/// Parses the page size argument, falling back to the configured default.
pub fn batch_size_arg(ctx: &OperationContext<'_>) -> Result<usize, GatewayError> {
    match integer_arg(ctx, "batch_size")? {
        None => Ok(ctx.state.default_batch_size()),
        Some(n) if n > 0 => Ok(n as usize),
        Some(_) => Err(GatewayError::invalid("batch_size must be a positive integer")),
    }
}

/// Resolves the call's connection. Never connects implicitly.
pub async fn connection(ctx: &OperationContext<'_>) -> Result<Arc<dyn BackendConnection>, GatewayError> {
    let name = &ctx.call.connection;
    ctx.state
        .registry
        .resolve(name, None)
        .await
        .map(|registered| registered.handle)
        .map_err(|e| GatewayError::from_connect(e, name))
}

/// Maps a backend error, repairing the connection first if it was lost.
///
/// A connectivity failure replaces the registry entry's handle with a fresh
/// connection to the same address. The client is then asked to retry; if the
/// reconnect fails too, the connection is reported lost.
pub async fn backend_failure(ctx: &OperationContext<'_>, err: BackendError) -> GatewayError {
    if !err.is_connectivity() {
        return err.into();
    }
    let name = &ctx.call.connection;
    warn!("Lost connection '{}': {}", name, err);
    match ctx.state.registry.reconnect(name).await {
        Ok(_) => GatewayError::RetryAfterReconnect,
        Err(e) => {
            warn!("Could not reconnect '{}': {}", name, e);
            GatewayError::ConnectionLost { name: name.clone() }
        }
    }
}

/// Converts a list of documents into an array value.
pub fn documents_value(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(Value::Document).collect())
}

/// Maps a cursor error. A stream that lost its connection is handled like any
/// other connectivity failure.
pub async fn cursor_failure(ctx: &OperationContext<'_>, err: CursorError) -> GatewayError {
    match err {
        CursorError::Stream(e) => backend_failure(ctx, e).await,
        other => other.into(),
    }
}

/// Renders a page as the `{results, id, ok}` envelope shared by `_find` and `_more`.
pub fn page_envelope(page: Page) -> Document {
    let mut envelope = Document::with_capacity(3);
    envelope.insert("results".to_string(), documents_value(page.results));
    envelope.insert("id".to_string(), Value::from(page.id));
    envelope.insert("ok".to_string(), Value::Int(1));
    envelope
}
