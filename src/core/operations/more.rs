// src/core/operations/more.rs

//! `_more`: returns the next page of an open cursor.

use super::helpers::{batch_size_arg, cursor_failure, page_envelope, require_method};
use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::cursor::CursorId;
use crate::core::handler::args::Method;
use crate::core::handler::reply::Reply;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct More {
    pub id: CursorId,
    pub batch_size: usize,
}

impl ParseOperation for More {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        require_method(ctx, Method::Get)?;
        let id = ctx
            .call
            .args
            .get("id")
            .ok_or_else(|| GatewayError::invalid("no cursor id given"))?;
        let id = id
            .trim()
            .parse::<CursorId>()
            .map_err(|_| GatewayError::invalid("cursor id must be a non-negative integer"))?;
        Ok(More {
            id,
            batch_size: batch_size_arg(ctx)?,
        })
    }
}

#[async_trait]
impl ExecutableOperation for More {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        match ctx.state.cursors.page(self.id, self.batch_size).await {
            Ok(page) => Ok(page_envelope(page).into()),
            Err(e) => Err(cursor_failure(ctx, e).await),
        }
    }
}
