// src/core/operations/authenticate.rs

//! `_authenticate`: authenticates the call's connection against a database.

use super::helpers::{backend_failure, connection, require_method};
use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::args::Method;
use crate::core::handler::reply::Reply;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Authenticate {
    pub db: String,
    pub username: String,
    pub password: String,
}

impl ParseOperation for Authenticate {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        require_method(ctx, Method::Post)?;
        let db = ctx
            .call
            .db
            .clone()
            .ok_or_else(|| GatewayError::invalid("db must be defined"))?;
        let required = |key: &str| {
            ctx.call
                .args
                .get(key)
                .map(str::to_string)
                .ok_or_else(|| GatewayError::invalid(format!("{key} must be defined")))
        };
        Ok(Authenticate {
            username: required("username")?,
            password: required("password")?,
            db,
        })
    }
}

#[async_trait]
impl ExecutableOperation for Authenticate {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        let conn = connection(ctx).await?;
        if let Err(e) = conn
            .authenticate(&self.db, &self.username, &self.password)
            .await
        {
            return Err(backend_failure(ctx, e).await);
        }
        info!(
            "Authenticated '{}' on connection '{}'",
            self.username, ctx.call.connection
        );
        Ok(Reply::ok())
    }
}
