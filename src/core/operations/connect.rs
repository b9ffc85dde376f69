// src/core/operations/connect.rs

//! `_connect`: registers a named connection to a backend server.
//!
//! The first connect for a name wins. Connecting an existing name again succeeds
//! and keeps the original address.

use super::helpers::require_method;
use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::args::Method;
use crate::core::handler::reply::Reply;
use crate::doc;
use async_trait::async_trait;

/// The server used when the request names none.
pub const DEFAULT_SERVER: &str = "mongodb://localhost:27017";

#[derive(Debug, Clone)]
pub struct Connect {
    pub server: String,
}

impl ParseOperation for Connect {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        require_method(ctx, Method::Post)?;
        let server = ctx
            .call
            .args
            .get("server")
            .unwrap_or(DEFAULT_SERVER)
            .to_string();
        Ok(Connect { server })
    }
}

#[async_trait]
impl ExecutableOperation for Connect {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        let name = &ctx.call.connection;
        ctx.state
            .registry
            .resolve(name, Some(self.server.as_str()))
            .await
            .map_err(|_| GatewayError::ConnectFailed {
                server: self.server.clone(),
                name: name.clone(),
            })?;
        Ok(doc! { "ok" => 1, "server" => self.server.as_str(), "name" => name.as_str() }.into())
    }
}
