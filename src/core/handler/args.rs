// src/core/handler/args.rs

//! Normalized request arguments.
//!
//! A GET request carries its arguments in the query string, where a key may repeat;
//! a POST request carries them in a form-encoded body, where the last value wins.
//! Operations read both through the same `contains`/`get` accessors and tell them
//! apart only to enforce the request method.

use crate::core::protocol::ext_json;
use crate::core::protocol::{Document, Value};
use indexmap::IndexMap;
use url::form_urlencoded;

/// The HTTP method an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Method {
    #[strum(serialize = "GET")]
    Get,
    #[strum(serialize = "POST")]
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    /// Query-string arguments. Every key maps to all of its values, in order.
    Query(IndexMap<String, Vec<String>>),
    /// Form-body arguments. One value per key.
    Form(IndexMap<String, String>),
}

impl Default for Args {
    fn default() -> Self {
        Args::Query(IndexMap::new())
    }
}

impl Args {
    /// Parses a URL query string. Pairs with an empty value are dropped.
    pub fn from_query_string(query: &str) -> Self {
        let mut map: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            map.entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        Args::Query(map)
    }

    /// Parses an `application/x-www-form-urlencoded` body. Pairs with an empty value
    /// are dropped and a repeated key keeps its last value.
    pub fn from_form_body(body: &[u8]) -> Self {
        let mut map = IndexMap::new();
        for (key, value) in form_urlencoded::parse(body) {
            if value.is_empty() {
                continue;
            }
            map.insert(key.into_owned(), value.into_owned());
        }
        Args::Form(map)
    }

    /// Builds arguments from the `args` object of a batch entry.
    ///
    /// Strings are taken as they are. Anything else is re-encoded as extended JSON,
    /// so `{"criteria": {"x": 1}}` reads exactly like `criteria={"x":1}` would. For a
    /// GET entry an array of strings becomes a repeated key.
    pub fn from_batch(method: Method, args: &Document) -> Self {
        match method {
            Method::Get => Args::Query(
                args.iter()
                    .map(|(key, value)| {
                        let values = match value {
                            Value::Array(items) if items.iter().all(|v| v.as_str().is_some()) => {
                                items.iter().map(batch_text).collect()
                            }
                            other => vec![batch_text(other)],
                        };
                        (key.clone(), values)
                    })
                    .collect(),
            ),
            Method::Post => Args::Form(
                args.iter()
                    .map(|(key, value)| (key.clone(), batch_text(value)))
                    .collect(),
            ),
        }
    }

    /// The method these arguments arrived with.
    pub fn method(&self) -> Method {
        match self {
            Args::Query(_) => Method::Get,
            Args::Form(_) => Method::Post,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        match self {
            Args::Query(map) => map.contains_key(key),
            Args::Form(map) => map.contains_key(key),
        }
    }

    /// The value for `key`. For query arguments this is the first value.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Args::Query(map) => map.get(key).and_then(|v| v.first()).map(String::as_str),
            Args::Form(map) => map.get(key).map(String::as_str),
        }
    }

    /// Interprets `key` as a flag. A present value is true unless it is `0` or `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
    }
}

fn batch_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => ext_json::encode(other),
    }
}
