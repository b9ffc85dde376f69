// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

#![allow(dead_code)]

use docgate::config::Config;
use docgate::core::Document;
use docgate::core::backend::MemoryBackend;
use docgate::core::handler::args::Args;
use docgate::core::handler::dispatcher::{Dispatcher, RoutedCall};
use docgate::core::handler::reply::Reply;
use docgate::core::handler::router::route_path;
use docgate::core::protocol::{Value, ext_json};
use docgate::core::registry::ServerAddress;
use docgate::core::state::GatewayState;
use docgate::server::initialization::preconnect_backends;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use url::form_urlencoded;

/// TestContext provides a gateway backed by an in-process memory backend, with the
/// configured backends already connected.
pub struct TestContext {
    pub state: Arc<GatewayState>,
    pub backend: Arc<MemoryBackend>,
    pub dispatcher: Dispatcher,
}

impl TestContext {
    /// Creates a new test context with default configuration
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Creates a new test context with custom configuration
    pub async fn with_config(config: Config) -> Self {
        Self::with_backend(config, MemoryBackend::new()).await
    }

    pub async fn with_backend(config: Config, backend: MemoryBackend) -> Self {
        // Initialize tracing (ignore error if already initialized)
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("warn"))
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();

        let backend = Arc::new(backend);
        let state = Arc::new(GatewayState::new(config, backend.clone()));
        preconnect_backends(&state).await;
        let dispatcher = Dispatcher::new(state.clone());
        Self {
            state,
            backend,
            dispatcher,
        }
    }

    /// The address of the default connection.
    pub fn default_address(&self) -> ServerAddress {
        ServerAddress::default()
    }

    /// Dispatches `path` with the given arguments and returns the raw reply.
    pub async fn call(&self, path: &str, args: Args) -> Reply {
        let route = route_path(path).expect("test paths must route");
        let call = RoutedCall::from_route(route, args).expect("test paths must name an operation");
        self.dispatcher.dispatch(&call).await
    }

    /// Issues a GET with `pairs` as the query string.
    pub async fn get(&self, path: &str, pairs: &[(&str, &str)]) -> Document {
        let query = encode_pairs(pairs);
        envelope(self.call(path, Args::from_query_string(&query)).await)
    }

    /// Issues a POST with `pairs` as the form body.
    pub async fn post(&self, path: &str, pairs: &[(&str, &str)]) -> Document {
        let body = encode_pairs(pairs);
        envelope(self.call(path, Args::from_form_body(body.as_bytes())).await)
    }

    /// Issues a `_batch` and returns each entry's decoded envelope.
    pub async fn batch(&self, requests: &str) -> Vec<Document> {
        let body = encode_pairs(&[("requests", requests)]);
        let reply = self
            .call("/_batch", Args::from_form_body(body.as_bytes()))
            .await;
        match ext_json::decode(&reply.render()).expect("batch output must be valid JSON") {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Document(doc) => doc,
                    other => panic!("batch entry is not a document: {other:?}"),
                })
                .collect(),
            Value::Document(doc) => panic!("batch failed: {doc:?}"),
            other => panic!("unexpected batch output: {other:?}"),
        }
    }

    /// Inserts `docs` (a JSON array) into `db.collection` on the default connection.
    pub async fn insert(&self, db: &str, collection: &str, docs: &str) -> Document {
        self.post(&format!("/{db}/{collection}/_insert"), &[("docs", docs)])
            .await
    }

    /// Runs a find and returns the `results` array.
    pub async fn find(&self, db: &str, collection: &str, pairs: &[(&str, &str)]) -> Vec<Value> {
        let response = self
            .get(&format!("/{db}/{collection}/_find"), pairs)
            .await;
        assert_ok(&response);
        results(&response)
    }
}

pub fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

pub fn envelope(reply: Reply) -> Document {
    match reply {
        Reply::Envelope(doc) => doc,
        Reply::Batch(_) => panic!("expected a single envelope"),
    }
}

pub fn results(response: &Document) -> Vec<Value> {
    match response.get("results") {
        Some(Value::Array(items)) => items.clone(),
        other => panic!("response has no results: {other:?}"),
    }
}

pub fn errmsg(response: &Document) -> &str {
    response
        .get("errmsg")
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("response has no errmsg: {response:?}"))
}

pub fn assert_ok(response: &Document) {
    assert_eq!(
        response.get("ok"),
        Some(&Value::Int(1)),
        "expected ok:1, got {response:?}"
    );
}

pub fn assert_failed(response: &Document, message: &str) {
    assert_eq!(
        response.get("ok"),
        Some(&Value::Int(0)),
        "expected ok:0, got {response:?}"
    );
    assert_eq!(errmsg(response), message);
}

pub fn field<'a>(value: &'a Value, key: &str) -> &'a Value {
    value
        .as_document()
        .and_then(|doc| doc.get(key))
        .unwrap_or_else(|| panic!("{value:?} has no field {key}"))
}
