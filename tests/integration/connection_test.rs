// tests/integration/connection_test.rs

//! Integration tests for named connections and connectivity loss
//! Tests: _connect, _status, _authenticate, _hello, reconnect behavior

use super::test_helpers::*;
use docgate::config::Config;
use docgate::core::backend::MemoryBackend;
use docgate::core::operations::hello::GREETING;
use docgate::core::protocol::Value;
use docgate::core::registry::ServerAddress;
use docgate::doc;

#[tokio::test]
async fn test_hello_needs_no_backend() {
    let config = Config {
        backends: vec![],
        ..Config::default()
    };
    let ctx = TestContext::with_config(config).await;
    let response = ctx.get("/_hello", &[]).await;
    assert_eq!(response, doc! { "ok" => 1, "msg" => GREETING });
}

#[tokio::test]
async fn test_status_lists_the_default_connection() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/_status", &[]).await;
    assert_eq!(
        response,
        doc! { "ok" => 1, "connections" => doc! { "default" => "localhost:27017" } }
    );
}

#[tokio::test]
async fn test_several_startup_backends_are_named_by_address() {
    let config = Config {
        backends: vec!["db1:27017".to_string(), "db2.local:27018".to_string()],
        ..Config::default()
    };
    let ctx = TestContext::with_config(config).await;
    let response = ctx.get("/_status", &[]).await;
    assert_eq!(
        response["connections"],
        Value::from(doc! { "db127017" => "db1:27017", "db2local27018" => "db2.local:27018" })
    );
}

#[tokio::test]
async fn test_connect_registers_a_name_once() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post("/_connect", &[("server", "db1:1234"), ("name", "main")])
        .await;
    assert_eq!(
        response,
        doc! { "ok" => 1, "server" => "db1:1234", "name" => "main" }
    );

    // A second connect keeps the first address.
    let again = ctx
        .post("/_connect", &[("server", "db2:9999"), ("name", "main")])
        .await;
    assert_ok(&again);
    let status = ctx.get("/_status", &[]).await;
    assert_eq!(field(&status["connections"], "main"), &Value::from("db1:1234"));
}

#[tokio::test]
async fn test_connect_requires_post() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/_connect", &[("server", "db1")]).await;
    assert_failed(&response, "_connect must be a POST request");
}

#[tokio::test]
async fn test_connect_to_an_unreachable_server_fails() {
    let backend = MemoryBackend::with_reachable([ServerAddress::default()]);
    let ctx = TestContext::with_backend(Config::default(), backend).await;

    let response = ctx
        .post("/_connect", &[("server", "nowhere:1"), ("name", "x")])
        .await;
    assert_eq!(
        response,
        doc! { "ok" => 0, "errmsg" => "could not connect", "server" => "nowhere:1", "name" => "x" }
    );
    assert!(ctx.state.registry.get("x").is_none());
}

#[tokio::test]
async fn test_unknown_connection_names_are_not_created_implicitly() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/test/c/_find", &[("name", "ghost")]).await;
    assert_failed(&response, "couldn't get connection to mongo");
    assert!(ctx.state.registry.get("ghost").is_none());
}

#[tokio::test]
async fn test_named_connections_reach_their_own_server() {
    let ctx = TestContext::new().await;
    ctx.post("/_connect", &[("server", "other:27017"), ("name", "other")])
        .await;
    ctx.post(
        "/test/c/_insert",
        &[("docs", r#"{"x":1}"#), ("name", "other")],
    )
    .await;

    assert!(ctx.find("test", "c", &[]).await.is_empty());
    assert_eq!(ctx.find("test", "c", &[("name", "other")]).await.len(), 1);
}

#[tokio::test]
async fn test_authenticate_checks_credentials() {
    let ctx = TestContext::new().await;
    let created = ctx
        .post(
            "/test/_cmd",
            &[("cmd", r#"{"createUser":"joe","pwd":"secret"}"#)],
        )
        .await;
    assert_ok(&created);

    let ok = ctx
        .post(
            "/test/_authenticate",
            &[("username", "joe"), ("password", "secret")],
        )
        .await;
    assert_eq!(ok, doc! { "ok" => 1 });

    let bad = ctx
        .post(
            "/test/_authenticate",
            &[("username", "joe"), ("password", "wrong")],
        )
        .await;
    assert_failed(&bad, "authentication failed");
}

#[tokio::test]
async fn test_authenticate_validates_its_arguments() {
    let ctx = TestContext::new().await;
    let response = ctx
        .post("/test/_authenticate", &[("password", "x")])
        .await;
    assert_failed(&response, "username must be defined");

    let response = ctx
        .post("/test/_authenticate", &[("username", "x")])
        .await;
    assert_failed(&response, "password must be defined");

    let response = ctx
        .get("/test/_authenticate", &[("username", "x"), ("password", "y")])
        .await;
    assert_failed(&response, "_authenticate must be a POST request");
}

// ===== Connectivity loss =====

#[tokio::test]
async fn test_dropped_connection_is_repaired_and_retry_suggested() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"{"x":1}"#).await;

    ctx.backend.drop_connections(&ctx.default_address());
    let response = ctx.get("/test/c/_find", &[]).await;
    assert_failed(&response, "auto reconnecting, please try again");

    // The registry now holds a fresh connection.
    assert_eq!(ctx.find("test", "c", &[]).await.len(), 1);
}

#[tokio::test]
async fn test_lost_server_reports_the_connection_name() {
    let ctx = TestContext::new().await;
    ctx.backend.disconnect(&ctx.default_address());

    let response = ctx.get("/test/c/_find", &[]).await;
    assert_eq!(
        response,
        doc! {
            "ok" => 0,
            "errmsg" => "wasn't connected to the db and couldn't reconnect",
            "name" => "default",
        }
    );

    ctx.backend.reconnect(&ctx.default_address());
    assert_ok(&ctx.get("/test/c/_find", &[]).await);
}

#[tokio::test]
async fn test_losing_the_server_mid_iteration_is_retryable() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"[{"i":1},{"i":2},{"i":3}]"#).await;

    let first = ctx.get("/test/c/_find", &[("batch_size", "1")]).await;
    assert_eq!(results(&first).len(), 1);

    ctx.backend.disconnect(&ctx.default_address());
    let response = ctx.get("/test/c/_more", &[("id", "0")]).await;
    assert_failed(
        &response,
        "wasn't connected to the db and couldn't reconnect",
    );
}
