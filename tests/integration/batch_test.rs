// tests/integration/batch_test.rs

//! Integration tests for the batch sub-dispatcher
//! Tests: _batch ordering, skipping, inline failures, argument adaptation

use super::test_helpers::*;
use docgate::core::protocol::Value;

#[tokio::test]
async fn test_failing_and_succeeding_entries_are_both_reported() {
    let ctx = TestContext::new().await;
    let entries = ctx
        .batch(
            r#"[
                {"cmd":"_insert","method":"POST","db":"test","collection":"c","args":{}},
                {"cmd":"_hello"}
            ]"#,
        )
        .await;
    assert_eq!(entries.len(), 2);
    assert_failed(&entries[0], "missing docs");
    assert_ok(&entries[1]);
}

#[tokio::test]
async fn test_entries_without_a_known_cmd_are_skipped() {
    let ctx = TestContext::new().await;
    let entries = ctx
        .batch(r#"[{"db":"test"},{"cmd":"_nope"},{"cmd":"_status"},"junk"]"#)
        .await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].contains_key("connections"));
}

#[tokio::test]
async fn test_entries_run_in_order_and_see_earlier_writes() {
    let ctx = TestContext::new().await;
    let entries = ctx
        .batch(
            r#"[
                {"cmd":"_insert","method":"POST","db":"test","collection":"c",
                 "args":{"docs":[{"x":1},{"x":2}]}},
                {"cmd":"_find","db":"test","collection":"c",
                 "args":{"criteria":{"x":2}}}
            ]"#,
        )
        .await;
    assert_eq!(entries.len(), 2);
    assert_ok(&entries[0]);
    let found = results(&entries[1]);
    assert_eq!(found.len(), 1);
    assert_eq!(field(&found[0], "x"), &Value::Int(2));
}

#[tokio::test]
async fn test_entries_default_to_get() {
    let ctx = TestContext::new().await;
    let entries = ctx
        .batch(r#"[{"cmd":"_insert","db":"test","collection":"c","args":{"docs":[{}]}}]"#)
        .await;
    assert_failed(&entries[0], "_insert must be a POST request");
}

#[tokio::test]
async fn test_entries_pick_their_connection_from_args() {
    let ctx = TestContext::new().await;
    let entries = ctx
        .batch(r#"[{"cmd":"_find","db":"test","collection":"c","args":{"name":"ghost"}}]"#)
        .await;
    assert_failed(&entries[0], "couldn't get connection to mongo");
}

#[tokio::test]
async fn test_batch_requires_post_and_requests() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/_batch", &[("requests", "[]")]).await;
    assert_failed(&response, "_batch must be a POST request");

    let response = ctx.post("/_batch", &[]).await;
    assert_failed(&response, "missing requests");

    let response = ctx.post("/_batch", &[("requests", r#"{"cmd":"_hello"}"#)]).await;
    assert_failed(&response, "requests must be a list");
}

#[tokio::test]
async fn test_empty_batch_renders_an_empty_array() {
    let ctx = TestContext::new().await;
    assert!(ctx.batch("[]").await.is_empty());
}
