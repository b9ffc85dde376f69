// src/core/protocol/value.rs

//! Defines the document value model exchanged between the HTTP surface and the backend.
//!
//! Plain JSON cannot express every value a document database stores (object
//! identifiers, timestamps, regular expressions) and gives no key-order guarantee
//! for objects. `Value` covers those types natively and `Document` keeps insertion
//! order, which order-sensitive commands such as multi-field sorts depend on.

use super::object_id::ObjectId;
use indexmap::IndexMap;
use std::cmp::Ordering;

/// An ordered mapping of field names to values.
pub type Document = IndexMap<String, Value>;

/// A single document value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    Document(Document),
    ObjectId(ObjectId),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
    Regex { pattern: String, options: String },
    Timestamp { time: u32, increment: u32 },
}

impl Value {
    /// Returns the name of the value's type, as used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Document(_) => "object",
            Value::ObjectId(_) => "objectId",
            Value::DateTime(_) => "date",
            Value::Regex { .. } => "regex",
            Value::Timestamp { .. } => "timestamp",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Double(d) if d.fract() == 0.0 => Some(*d as i64),
            _ => None,
        }
    }

    /// Interprets the value the way a query flag is interpreted: anything but
    /// `false`, `null` or numeric zero is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            _ => true,
        }
    }

    /// The rank of the value's type in the canonical cross-type sort order.
    fn canonical_rank(&self) -> u8 {
        match self {
            Value::Null => 1,
            Value::Int(_) | Value::Double(_) => 2,
            Value::String(_) => 3,
            Value::Document(_) => 4,
            Value::Array(_) => 5,
            Value::ObjectId(_) => 7,
            Value::Bool(_) => 8,
            Value::DateTime(_) => 9,
            Value::Timestamp { .. } => 10,
            Value::Regex { .. } => 11,
        }
    }

    /// Returns true when both values belong to the same comparison bracket.
    /// Range operators only compare values within one bracket.
    pub fn same_bracket(&self, other: &Value) -> bool {
        self.canonical_rank() == other.canonical_rank()
    }

    /// Total order over values: first by type rank, then by value within the type.
    pub fn canonical_cmp(&self, other: &Value) -> Ordering {
        let rank = self.canonical_rank().cmp(&other.canonical_rank());
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (a @ (Value::Int(_) | Value::Double(_)), b) => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.total_cmp(&y)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Document(a), Value::Document(b)) => cmp_documents(a, b),
            (Value::Array(a), Value::Array(b)) => cmp_sequences(a, b),
            (Value::ObjectId(a), Value::ObjectId(b)) => a.bytes().cmp(&b.bytes()),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (
                Value::Timestamp {
                    time: t1,
                    increment: i1,
                },
                Value::Timestamp {
                    time: t2,
                    increment: i2,
                },
            ) => (t1, i1).cmp(&(t2, i2)),
            (
                Value::Regex {
                    pattern: p1,
                    options: o1,
                },
                Value::Regex {
                    pattern: p2,
                    options: o2,
                },
            ) => (p1, o1).cmp(&(p2, o2)),
            _ => Ordering::Equal,
        }
    }

    /// Equality used by query matching, where `1` and `1.0` are the same number.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_) | Value::Double(_), Value::Int(_) | Value::Double(_)) => {
                self.canonical_cmp(other) == Ordering::Equal
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Document(a), Value::Document(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.loose_eq(vb))
            }
            _ => self == other,
        }
    }
}

fn cmp_sequences(a: &[Value], b: &[Value]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let ord = x.canonical_cmp(y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn cmp_documents(a: &Document, b: &Document) -> Ordering {
    for ((ka, va), (kb, vb)) in a.iter().zip(b) {
        let ord = va
            .canonical_cmp(vb)
            .then_with(|| ka.as_str().cmp(kb.as_str()));
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::ObjectId(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Builds a `Document` from `key => value` pairs, preserving the written order.
#[macro_export]
macro_rules! doc {
    () => { $crate::core::protocol::Document::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut d = $crate::core::protocol::Document::new();
        $( d.insert(($key).to_string(), $crate::core::protocol::Value::from($value)); )+
        d
    }};
}
