// src/core/operations/find.rs

//! `_find`: runs a query, opens a cursor over the results and returns the first page.

use super::helpers::{
    backend_failure, batch_size_arg, connection, cursor_failure, document_arg, documents_value,
    integer_arg, page_envelope, require_method, require_namespace,
};
use super::{ExecutableOperation, OperationContext, ParseOperation};
use crate::core::GatewayError;
use crate::core::backend::{FindSpec, SortDirection};
use crate::core::handler::args::Method;
use crate::core::handler::reply::Reply;
use crate::core::protocol::{Document, Value, ext_json};
use crate::doc;
use async_trait::async_trait;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Find {
    pub db: String,
    pub collection: String,
    pub spec: FindSpec,
    pub batch_size: usize,
    pub explain: bool,
}

impl ParseOperation for Find {
    fn parse(ctx: &OperationContext<'_>) -> Result<Self, GatewayError> {
        require_method(ctx, Method::Get)?;
        let (db, collection) = require_namespace(ctx)?;

        let criteria = document_arg(ctx, "criteria")?.unwrap_or_default();
        let fields = ctx
            .call
            .args
            .get("fields")
            .map(parse_fields)
            .transpose()?;
        let sort = document_arg(ctx, "sort")?
            .map(|doc| parse_sort(&doc))
            .unwrap_or_default();
        // A negative limit means the same as its absolute value.
        let limit = integer_arg(ctx, "limit")?.map_or(0, i64::unsigned_abs);
        let skip = match integer_arg(ctx, "skip")? {
            None => 0,
            Some(n) => u64::try_from(n)
                .map_err(|_| GatewayError::invalid("skip must be a non-negative integer"))?,
        };

        Ok(Find {
            db,
            collection,
            spec: FindSpec {
                criteria,
                fields,
                sort,
                skip,
                limit,
            },
            batch_size: batch_size_arg(ctx)?,
            explain: ctx.call.args.flag("explain"),
        })
    }
}

/// Reads `fields` as either a projection document or a list of field names to include.
fn parse_fields(text: &str) -> Result<Document, GatewayError> {
    match ext_json::decode(text)? {
        Value::Document(doc) => Ok(doc),
        Value::Array(names) => names
            .iter()
            .map(|name| {
                name.as_str()
                    .map(|n| (n.to_string(), Value::Int(1)))
                    .ok_or_else(|| GatewayError::invalid("fields must list field names"))
            })
            .collect(),
        _ => Err(GatewayError::invalid("fields must list field names")),
    }
}

/// A direction of `-1` sorts descending; anything else ascending.
fn parse_sort(doc: &Document) -> Vec<(String, SortDirection)> {
    doc.iter()
        .map(|(field, direction)| {
            let direction = if direction.as_f64() == Some(-1.0) {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            (field.clone(), direction)
        })
        .collect()
}

#[async_trait]
impl ExecutableOperation for Find {
    async fn execute(&self, ctx: &OperationContext<'_>) -> Result<Reply, GatewayError> {
        let conn = connection(ctx).await?;

        if self.explain {
            let plan = match conn
                .explain(&self.db, &self.collection, self.spec.clone())
                .await
            {
                Ok(plan) => plan,
                Err(e) => return Err(backend_failure(ctx, e).await),
            };
            return Ok(doc! { "results" => documents_value(vec![plan]), "ok" => 1 }.into());
        }

        let stream = match conn
            .find(&self.db, &self.collection, self.spec.clone())
            .await
        {
            Ok(stream) => stream,
            Err(e) => return Err(backend_failure(ctx, e).await),
        };
        let id = ctx.state.cursors.open(stream);
        debug!("Cursor {} opened for {}.{}", id, self.db, self.collection);

        match ctx.state.cursors.page(id, self.batch_size).await {
            Ok(page) => Ok(page_envelope(page).into()),
            Err(e) => Err(cursor_failure(ctx, e).await),
        }
    }
}
