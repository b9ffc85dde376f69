// src/core/operations/remove.rs

//! `_remove`: removes documents matching `criteria`, or every document without one.

use super::helpers::{backend_failure, connection, document_arg, require_method, require_namespace};
use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::args::Method;
use crate::core::handler::reply::Reply;
use crate::core::protocol::Document;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Remove {
    pub db: String,
    pub collection: String,
    pub criteria: Document,
    pub safe: bool,
}

impl ParseOperation for Remove {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        require_method(ctx, Method::Post)?;
        let (db, collection) = require_namespace(ctx)?;
        Ok(Remove {
            db,
            collection,
            criteria: document_arg(ctx, "criteria")?.unwrap_or_default(),
            safe: ctx.call.args.flag("safe"),
        })
    }
}

#[async_trait]
impl ExecutableOperation for Remove {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        let conn = connection(ctx).await?;
        match conn
            .remove(&self.db, &self.collection, self.criteria.clone())
            .await
        {
            Ok(removed) => debug!("Removed {} documents from {}.{}", removed, self.db, self.collection),
            Err(e) => return Err(backend_failure(ctx, e).await),
        }

        if !self.safe {
            return Ok(Reply::ok());
        }
        match conn.last_status(&self.db).await {
            Ok(status) => Ok(status.into()),
            Err(e) => Err(backend_failure(ctx, e).await),
        }
    }
}
