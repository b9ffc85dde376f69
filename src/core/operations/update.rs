// src/core/operations/update.rs

//! `_update`: updates documents matching `criteria` with `newobj`.

use super::helpers::{
    backend_failure, connection, require_method, require_namespace, required_document_arg,
};
use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::args::Method;
use crate::core::handler::reply::Reply;
use crate::core::protocol::Document;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct Update {
    pub db: String,
    pub collection: String,
    pub criteria: Document,
    pub newobj: Document,
    pub upsert: bool,
    pub multi: bool,
    pub safe: bool,
}

impl ParseOperation for Update {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        require_method(ctx, Method::Post)?;
        let (db, collection) = require_namespace(ctx)?;
        let criteria = required_document_arg(ctx, "criteria")?;
        let newobj = required_document_arg(ctx, "newobj")?;
        let args = &ctx.call.args;
        Ok(Update {
            db,
            collection,
            criteria,
            newobj,
            upsert: args.flag("upsert"),
            multi: args.flag("multi"),
            safe: args.flag("safe"),
        })
    }
}

#[async_trait]
impl ExecutableOperation for Update {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        let conn = connection(ctx).await?;
        let result = conn
            .update(
                &self.db,
                &self.collection,
                self.criteria.clone(),
                self.newobj.clone(),
                self.upsert,
                self.multi,
            )
            .await;
        if let Err(e) = result {
            return Err(backend_failure(ctx, e).await);
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
