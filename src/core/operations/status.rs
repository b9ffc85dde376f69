// src/core/operations/status.rs

//! `_status`: lists every registered connection with its address.

use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::reply::Reply;
use crate::core::protocol::{Document, Value};
use crate::doc;
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct Status;

impl ParseOperation for Status {
    fn parse(_ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        Ok(Status)
    }
}

#[async_trait]
impl ExecutableOperation for Status {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        let connections: Document = ctx
            .state
            .registry
            .snapshot()
            .into_iter()
            .map(|(name, address)| (name, Value::String(address)))
            .collect();
        Ok(doc! { "ok" => 1, "connections" => connections }.into())
    }
}
