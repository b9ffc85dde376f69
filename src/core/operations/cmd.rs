// src/core/operations/cmd.rs

//! `_cmd`: runs an arbitrary database command.
//!
//! The backend's reply is returned as is. When the command fails, the command text
//! the client sent is echoed back under `cmd`.

use super::helpers::{backend_failure, connection};
use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::reply::Reply;
use crate::core::handler::router::ADMIN_DB;
use crate::core::protocol::{Document, Value, ext_json};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct Cmd {
    pub db: String,
    pub command: Document,
    /// The command as the client sent it.
    pub text: String,
}

impl ParseOperation for Cmd {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        let text = ctx
            .call
            .args
            .get("cmd")
            .ok_or_else(|| GatewayError::invalid("missing cmd"))?
            .to_string();
        let command = ext_json::decode_document(&text)?;
        let db = ctx.call.db.as_deref().unwrap_or(ADMIN_DB).to_string();
        Ok(Cmd { db, command, text })
    }
}

impl Cmd {
    fn with_echo(&self, mut envelope: Document) -> Document {
        envelope.insert("cmd".to_string(), Value::String(self.text.clone()));
        envelope
    }
}

#[async_trait]
impl ExecutableOperation for Cmd {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        let conn = connection(ctx).await?;
        match conn.run_command(&self.db, self.command.clone()).await {
            Ok(result) => {
                let failed = matches!(result.get("ok"), Some(ok) if !ok.is_truthy());
                if failed {
                    Ok(self.with_echo(result).into())
                } else {
                    Ok(result.into())
                }
            }
            Err(e) if e.is_connectivity() => Err(backend_failure(ctx, e).await),
            Err(e) => Ok(self.with_echo(GatewayError::from(e).into_envelope()).into()),
        }
    }
}
