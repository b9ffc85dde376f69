// tests/integration/cursor_test.rs

//! Integration tests for server-side cursors
//! Tests: _find paging, _more, cursor ids, exhaustion

use super::test_helpers::*;
use docgate::core::protocol::Value;
use docgate::core::tasks::cursor_reaper::reap_idle_cursors;
use futures::future::join_all;
use std::time::Duration;

async fn seed(ctx: &TestContext, n: usize) {
    let docs: Vec<String> = (0..n).map(|i| format!(r#"{{"i":{i}}}"#)).collect();
    let response = ctx
        .insert("test", "paged", &format!("[{}]", docs.join(",")))
        .await;
    assert_ok(&response);
}

fn cursor_id(response: &docgate::core::Document) -> String {
    match response.get("id") {
        Some(Value::Int(id)) => id.to_string(),
        other => panic!("response carries no cursor id: {other:?}"),
    }
}

#[tokio::test]
async fn test_default_batch_size_is_fifteen() {
    let ctx = TestContext::new().await;
    seed(&ctx, 40).await;

    let first = ctx.get("/test/paged/_find", &[]).await;
    assert_eq!(results(&first).len(), 15);
    let id = cursor_id(&first);

    let second = ctx.get("/test/paged/_more", &[("id", &id)]).await;
    assert_eq!(results(&second).len(), 15);
    let third = ctx.get("/test/paged/_more", &[("id", &id)]).await;
    assert_eq!(results(&third).len(), 10);

    // An exhausted cursor keeps answering with empty pages.
    for _ in 0..2 {
        let page = ctx.get("/test/paged/_more", &[("id", &id)]).await;
        assert_ok(&page);
        assert!(results(&page).is_empty());
    }
}

#[tokio::test]
async fn test_pages_preserve_result_order() {
    let ctx = TestContext::new().await;
    seed(&ctx, 7).await;

    let first = ctx
        .get(
            "/test/paged/_find",
            &[("sort", r#"{"i":1}"#), ("batch_size", "3")],
        )
        .await;
    let id = cursor_id(&first);
    let mut seen = results(&first);
    loop {
        let page = ctx
            .get("/test/paged/_more", &[("id", &id), ("batch_size", "3")])
            .await;
        let items = results(&page);
        if items.is_empty() {
            break;
        }
        seen.extend(items);
    }
    let order: Vec<&Value> = seen.iter().map(|doc| field(doc, "i")).collect();
    let expected: Vec<Value> = (0..7).map(Value::Int).collect();
    assert_eq!(order, expected.iter().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_cursor_ids_increase_from_zero() {
    let ctx = TestContext::new().await;
    seed(&ctx, 1).await;

    for expected in 0..3 {
        let response = ctx.get("/test/paged/_find", &[]).await;
        assert_eq!(response["id"], Value::Int(expected));
    }
}

#[tokio::test]
async fn test_more_without_an_id_fails() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/test/paged/_more", &[]).await;
    assert_failed(&response, "no cursor id given");
}

#[tokio::test]
async fn test_more_with_an_unknown_id_fails() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/test/paged/_more", &[("id", "99")]).await;
    assert_failed(&response, "couldn't find the cursor with id 99");
}

#[tokio::test]
async fn test_more_requires_get() {
    let ctx = TestContext::new().await;
    let response = ctx.post("/test/paged/_more", &[("id", "0")]).await;
    assert_failed(&response, "_more must be a GET request");
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/test/paged/_find", &[("batch_size", "0")]).await;
    assert_failed(&response, "batch_size must be a positive integer");
}

#[tokio::test]
async fn test_idle_cursors_are_reaped() {
    let ctx = TestContext::new().await;
    seed(&ctx, 20).await;

    let first = ctx.get("/test/paged/_find", &[]).await;
    let id = cursor_id(&first);
    assert_eq!(reap_idle_cursors(&ctx.state, Duration::from_secs(60)), 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(reap_idle_cursors(&ctx.state, Duration::from_millis(1)), 1);
    let response = ctx.get("/test/paged/_more", &[("id", &id)]).await;
    assert_failed(&response, &format!("couldn't find the cursor with id {id}"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_paging_keeps_cursors_apart() {
    let ctx = TestContext::new().await;
    seed(&ctx, 30).await;

    let ascending = ctx
        .get("/test/paged/_find", &[("sort", r#"{"i":1}"#), ("batch_size", "1")])
        .await;
    let descending = ctx
        .get("/test/paged/_find", &[("sort", r#"{"i":-1}"#), ("batch_size", "1")])
        .await;
    let opened = |response: &docgate::core::Document| {
        let id: u64 = cursor_id(response).parse().unwrap();
        (id, field(&results(response)[0], "i").clone())
    };
    let cursors = [opened(&ascending), opened(&descending)];

    let drains = cursors.into_iter().map(|(id, first)| {
        let state = ctx.state.clone();
        tokio::spawn(async move {
            let mut seen = vec![first];
            loop {
                let page = state.cursors.page(id, 2).await.unwrap();
                if page.results.is_empty() {
                    break;
                }
                seen.extend(page.results.iter().filter_map(|doc| doc.get("i").cloned()));
                tokio::task::yield_now().await;
            }
            seen
        })
    });
    let drained: Vec<Vec<Value>> = join_all(drains)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let up: Vec<Value> = (0..30).map(Value::Int).collect();
    let down: Vec<Value> = (0..30).rev().map(Value::Int).collect();
    assert_eq!(drained[0], up);
    assert_eq!(drained[1], down);
}
