// src/core/handler/reply.rs

//! Operation replies and their JSON rendering.

use crate::core::errors::GatewayError;
use crate::core::protocol::ext_json;
use crate::core::protocol::{Document, Value};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A JavaScript identifier or a dotted path of them, such as `app.handlers.show`.
    static ref CALLBACK_NAME: Regex =
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap();
}

/// What an operation produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A single response envelope.
    Envelope(Document),
    /// The rendered output of each batch entry, in execution order.
    Batch(Vec<String>),
}

impl Reply {
    /// A bare `{ok: 1}` envelope.
    pub fn ok() -> Self {
        Reply::Envelope(ok_envelope())
    }

    /// Renders the reply as extended JSON text.
    pub fn render(&self) -> String {
        match self {
            Reply::Envelope(doc) => ext_json::encode_document(doc),
            Reply::Batch(fragments) => format!("[{}]", fragments.join(",")),
        }
    }

    /// True when the reply reports a failure. A batch never does as a whole.
    pub fn is_failure(&self) -> bool {
        match self {
            Reply::Envelope(doc) => matches!(doc.get("ok"), Some(v) if !v.is_truthy()),
            Reply::Batch(_) => false,
        }
    }
}

impl From<Document> for Reply {
    fn from(doc: Document) -> Self {
        Reply::Envelope(doc)
    }
}

pub fn ok_envelope() -> Document {
    let mut doc = Document::with_capacity(1);
    doc.insert("ok".to_string(), Value::Int(1));
    doc
}

/// Wraps a rendered body for a JSONP `callback`. Only identifier paths are accepted
/// as callback names.
pub fn wrap_jsonp(callback: &str, body: &str) -> Result<String, GatewayError> {
    if !CALLBACK_NAME.is_match(callback) {
        return Err(GatewayError::invalid("invalid JSONP callback name"));
    }
    Ok(format!("{callback}({body})"))
}
