// src/core/protocol/ext_json.rs

//! The extended JSON codec.
//!
//! Text is first parsed as standard JSON and then lifted into `Value`:
//!
//! - An object carrying the ordering-hint key (`$pyhint`) is rebuilt as an ordered
//!   document from its `[{"key": .., "value": ..}, ..]` pairs.
//! - Tagged objects (`$oid`, `$date`, `$regex`/`$options`, `$timestamp`,
//!   `$numberLong`) become native scalar values.
//!
//! Encoding is the inverse: native scalars are re-tagged, documents are written in
//! their stored key order.

use super::object_id::ObjectId;
use super::value::{Document, Value};
use chrono::DateTime;
use serde_json::{Map, Number, Value as Json};
use thiserror::Error;

/// The reserved key that carries an explicit field order.
pub const ORDERING_HINT_KEY: &str = "$pyhint";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("couldn't parse json: {0}")]
    Malformed(String),

    #[error("type is not iterable: {0}")]
    NotIterable(String),

    #[error("couldn't parse json: {text} ({reason})")]
    BadExtendedValue { text: String, reason: String },
}

/// Decodes text into a document or array. Any other top-level value is rejected.
pub fn decode(text: &str) -> Result<Value, DecodeError> {
    let json: Json =
        serde_json::from_str(text).map_err(|_| DecodeError::Malformed(text.to_string()))?;
    let value = from_json(json).map_err(|reason| DecodeError::BadExtendedValue {
        text: text.to_string(),
        reason,
    })?;
    match value {
        Value::Document(_) | Value::Array(_) => Ok(value),
        _ => Err(DecodeError::NotIterable(text.to_string())),
    }
}

/// Decodes text that must hold a single document.
pub fn decode_document(text: &str) -> Result<Document, DecodeError> {
    match decode(text)? {
        Value::Document(doc) => Ok(doc),
        _ => Err(DecodeError::NotIterable(text.to_string())),
    }
}

/// Encodes a value as compact extended JSON text.
pub fn encode(value: &Value) -> String {
    to_json(value).to_string()
}

pub fn encode_document(doc: &Document) -> String {
    document_to_json(doc).to_string()
}

/// Lifts a parsed JSON value into the document model.
pub fn from_json(json: Json) -> Result<Value, String> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => number_to_value(&n),
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_json)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Json::Object(map) => object_to_value(map)?,
    })
}

fn number_to_value(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Int(i)
    } else {
        // u64 values beyond i64 and all fractional numbers.
        Value::Double(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn object_to_value(map: Map<String, Json>) -> Result<Value, String> {
    if map.contains_key(ORDERING_HINT_KEY) {
        return ordered_from_hint(map);
    }
    if let Some(scalar) = tagged_scalar(&map)? {
        return Ok(scalar);
    }
    let mut doc = Document::with_capacity(map.len());
    for (key, value) in map {
        doc.insert(key, from_json(value)?);
    }
    Ok(Value::Document(doc))
}

fn ordered_from_hint(mut map: Map<String, Json>) -> Result<Value, String> {
    let Some(Json::Array(pairs)) = map.remove(ORDERING_HINT_KEY) else {
        return Err(format!("{ORDERING_HINT_KEY} must be an array of key/value pairs"));
    };
    let mut doc = Document::with_capacity(pairs.len());
    for pair in pairs {
        let Json::Object(mut pair) = pair else {
            return Err(format!("{ORDERING_HINT_KEY} entries must be objects"));
        };
        let Some(Json::String(key)) = pair.remove("key") else {
            return Err(format!("{ORDERING_HINT_KEY} entries need a string 'key'"));
        };
        let value = pair.remove("value").unwrap_or(Json::Null);
        doc.insert(key, from_json(value)?);
    }
    Ok(Value::Document(doc))
}

/// Recognizes the tagged single-purpose objects. Returns `Ok(None)` for ordinary objects.
fn tagged_scalar(map: &Map<String, Json>) -> Result<Option<Value>, String> {
    let arity = map.len();
    // `$options` may precede `$regex` in the source text.
    let first = if map.contains_key("$regex") && arity <= 2 {
        "$regex"
    } else {
        match map.keys().next() {
            Some(k) if k.starts_with('$') => k.as_str(),
            _ => return Ok(None),
        }
    };

    match (first, arity) {
        ("$oid", 1) => {
            let hex = map[first].as_str().ok_or("$oid must be a string")?;
            let oid = hex.parse::<ObjectId>().map_err(|e| e.to_string())?;
            Ok(Some(Value::ObjectId(oid)))
        }
        ("$date", 1) => Ok(Some(Value::DateTime(parse_date(&map[first])?))),
        ("$numberLong", 1) => {
            let s = map[first].as_str().ok_or("$numberLong must be a string")?;
            let i = s
                .parse::<i64>()
                .map_err(|_| format!("invalid $numberLong '{s}'"))?;
            Ok(Some(Value::Int(i)))
        }
        ("$timestamp", 1) => {
            let ts = map[first]
                .as_object()
                .ok_or("$timestamp must be an object")?;
            let field = |name: &str| {
                ts.get(name)
                    .and_then(Json::as_u64)
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| format!("$timestamp.{name} must be a 32-bit unsigned integer"))
            };
            Ok(Some(Value::Timestamp {
                time: field("t")?,
                increment: field("i")?,
            }))
        }
        ("$regex", 1 | 2) => {
            let pattern = match &map["$regex"] {
                Json::String(s) => s.clone(),
                // `{"$regex": ..}` with a non-string payload is a query operator shape
                // the backend rejects; keep it as a plain document.
                _ => return Ok(None),
            };
            let options = match map.get("$options") {
                Some(Json::String(s)) => s.clone(),
                Some(_) => return Err("$options must be a string".to_string()),
                None if arity == 2 => return Ok(None),
                None => String::new(),
            };
            Ok(Some(Value::Regex { pattern, options }))
        }
        _ => Ok(None),
    }
}

fn parse_date(json: &Json) -> Result<i64, String> {
    match json {
        Json::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| "invalid $date".to_string()),
        Json::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .map_err(|e| format!("invalid $date '{s}': {e}")),
        Json::Object(inner) => match inner.get("$numberLong").and_then(Json::as_str) {
            Some(s) => s.parse().map_err(|_| format!("invalid $date '{s}'")),
            None => Err("invalid $date".to_string()),
        },
        _ => Err("invalid $date".to_string()),
    }
}

/// Lowers a value into plain JSON, tagging the scalars JSON cannot express.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Double(d) => Number::from_f64(*d).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Document(doc) => document_to_json(doc),
        Value::ObjectId(oid) => tagged("$oid", Json::String(oid.to_hex())),
        Value::DateTime(ms) => tagged("$date", Json::Number((*ms).into())),
        Value::Regex { pattern, options } => {
            let mut map = Map::new();
            map.insert("$regex".to_string(), Json::String(pattern.clone()));
            map.insert("$options".to_string(), Json::String(options.clone()));
            Json::Object(map)
        }
        Value::Timestamp { time, increment } => {
            let mut inner = Map::new();
            inner.insert("t".to_string(), Json::Number((*time).into()));
            inner.insert("i".to_string(), Json::Number((*increment).into()));
            tagged("$timestamp", Json::Object(inner))
        }
    }
}

pub fn document_to_json(doc: &Document) -> Json {
    let mut map = Map::with_capacity(doc.len());
    for (key, value) in doc {
        map.insert(key.clone(), to_json(value));
    }
    Json::Object(map)
}

fn tagged(tag: &str, payload: Json) -> Json {
    let mut map = Map::with_capacity(1);
    map.insert(tag.to_string(), payload);
    Json::Object(map)
}
