// src/core/operations/insert.rs

//! `_insert`: inserts one document or a list of documents.

use super::helpers::{backend_failure, connection, require_method, require_namespace};
use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::handler::args::Method;
use crate::core::handler::reply::Reply;
use crate::core::protocol::{Document, Value, ext_json};
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct Insert {
    pub db: String,
    pub collection: String,
    pub docs: Vec<Document>,
    pub safe: bool,
}

impl ParseOperation for Insert {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        require_method(ctx, Method::Post)?;
        let (db, collection) = require_namespace(ctx)?;
        let text = ctx
            .call
            .args
            .get("docs")
            .ok_or_else(|| GatewayError::invalid("missing docs"))?;
        let docs = match ext_json::decode(text)? {
            Value::Document(doc) => vec![doc],
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Document(doc) => Ok(doc),
                    other => Err(GatewayError::invalid(format!(
                        "docs must be documents, got {}",
                        other.type_name()
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(GatewayError::invalid("docs must be documents")),
        };
        Ok(Insert {
            db,
            collection,
            docs,
            safe: ctx.call.args.flag("safe"),
        })
    }
}

#[async_trait]
impl ExecutableOperation for Insert {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        let conn = connection(ctx).await?;
        let oids = match conn
            .insert(&self.db, &self.collection, self.docs.clone())
            .await
        {
            Ok(oids) => oids,
            Err(e) => return Err(backend_failure(ctx, e).await),
        };

        let mut envelope = Document::with_capacity(3);
        envelope.insert("oids".to_string(), Value::Array(oids));
        if self.safe {
            let status = match conn.last_status(&self.db).await {
                Ok(status) => status,
                Err(e) => return Err(backend_failure(ctx, e).await),
            };
            envelope.insert("status".to_string(), Value::Document(status));
        }
        envelope.insert("ok".to_string(), Value::Int(1));
        Ok(envelope.into())
    }
}
