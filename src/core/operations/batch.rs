// src/core/operations/batch.rs

//! `_batch`: runs a list of requests in one round trip.
//!
//! Each entry names an operation (`cmd`), an optional `method` (GET unless it says
//! POST), an optional `db` and `collection`, and its `args`. Entries run one after
//! another through the regular dispatcher, so a write is visible to every later
//! entry. An entry that fails is reported inline and does not stop the batch.
//! Entries without `cmd`, or whose `cmd` is not a known operation, are skipped.

use super::helpers::require_method;
use super::{ExecutableOperation, Operation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::args::{Args, Method};
use crate::core::handler::dispatcher::{Dispatcher, RoutedCall};
use crate::core::handler::reply::Reply;
use crate::core::protocol::{Document, Value, ext_json};
use async_trait::async_trait;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Batch {
    pub calls: Vec<RoutedCall>,
}

impl ParseOperation for Batch {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        require_method(ctx, Method::Post)?;
        let text = ctx
            .call
            .args
            .get("requests")
            .ok_or_else(|| GatewayError::invalid("missing requests"))?;
        let Value::Array(entries) = ext_json::decode(text)? else {
            return Err(GatewayError::invalid("requests must be a list"));
        };
        let calls = entries.iter().filter_map(parse_entry).collect();
        Ok(Batch { calls })
    }
}

/// Builds the call for one batch entry, or `None` if the entry is to be skipped.
fn parse_entry(entry: &Value) -> Option<RoutedCall> {
    let entry = entry.as_document()?;
    let cmd = entry.get("cmd").and_then(Value::as_str)?;
    let Ok(operation) = Operation::from_str(cmd) else {
        debug!("Skipping batch entry with unknown cmd '{}'", cmd);
        return None;
    };

    let method = match entry.get("method").and_then(Value::as_str) {
        Some(m) if m.eq_ignore_ascii_case("POST") => Method::Post,
        _ => Method::Get,
    };
    let text = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_string);
    let empty = Document::new();
    let args = entry
        .get("args")
        .and_then(Value::as_document)
        .unwrap_or(&empty);

    Some(RoutedCall::new(
        operation,
        text("db"),
        text("collection"),
        Args::from_batch(method, args),
    ))
}

#[async_trait]
impl ExecutableOperation for Batch {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        info!("Running batch of {} requests", self.calls.len());
        let dispatcher = Dispatcher::new(ctx.state.clone());
        let mut fragments = Vec::with_capacity(self.calls.len());
        for call in &self.calls {
            let reply = dispatcher.dispatch(call).await;
            fragments.push(reply.render());
        }
        Ok(Reply::Batch(fragments))
    }
}
