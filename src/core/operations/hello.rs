// src/core/operations/hello.rs

//! `_hello`: a liveness probe that needs no backend.

use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::reply::Reply;
use crate::doc;
use async_trait::async_trait;

pub const GREETING: &str = "Uh, we had a slight weapons malfunction, but uh... everything's \
perfectly all right now. We're fine. We're all fine here now, thank you. How are you?";

#[derive(Debug, Clone, Default)]
pub struct Hello;

impl ParseOperation for Hello {
    fn parse(_ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        Ok(Hello)
    }
}

#[async_trait]
impl ExecutableOperation for Hello {
    async fn execute(&self, _ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        Ok(doc! { "ok" => 1, "msg" => GREETING }.into())
    }
}
