// tests/integration/crud_test.rs

//! Integration tests for the data operations
//! Tests: _insert, _find, _update, _remove, _cmd

use super::test_helpers::*;
use docgate::core::protocol::Value;
use docgate::doc;

// ===== _insert =====

#[tokio::test]
async fn test_insert_then_find_returns_every_document() {
    let ctx = TestContext::new().await;

    let response = ctx.insert("test", "mongoose", r#"[{"x":1},{"x":2},{"x":3}]"#).await;
    assert_ok(&response);
    match response.get("oids") {
        Some(Value::Array(oids)) => {
            assert_eq!(oids.len(), 3);
            assert!(oids.iter().all(|id| matches!(id, Value::ObjectId(_))));
        }
        other => panic!("missing oids: {other:?}"),
    }

    let found = ctx.find("test", "mongoose", &[]).await;
    assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn test_insert_accepts_a_single_document() {
    let ctx = TestContext::new().await;
    let response = ctx.insert("test", "c", r#"{"_id":"a","v":true}"#).await;
    assert_ok(&response);
    assert_eq!(response["oids"], Value::Array(vec![Value::from("a")]));
}

#[tokio::test]
async fn test_insert_without_docs_fails() {
    let ctx = TestContext::new().await;
    let response = ctx.post("/test/c/_insert", &[]).await;
    assert_failed(&response, "missing docs");
}

#[tokio::test]
async fn test_insert_requires_post() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/test/c/_insert", &[("docs", "[]")]).await;
    assert_failed(&response, "_insert must be a POST request");
}

#[tokio::test]
async fn test_insert_requires_a_collection() {
    let ctx = TestContext::new().await;
    let response = ctx.post("/test/_insert", &[("docs", "[]")]).await;
    assert_failed(&response, "db and collection must be defined");
}

#[tokio::test]
async fn test_insert_with_bad_json_reports_the_text() {
    let ctx = TestContext::new().await;
    let response = ctx.post("/test/c/_insert", &[("docs", "{x")]).await;
    assert_failed(&response, "couldn't parse json: {x");
}

#[tokio::test]
async fn test_safe_insert_includes_the_last_status() {
    let ctx = TestContext::new().await;
    let response = ctx
        .post("/test/c/_insert", &[("docs", r#"[{"a":1}]"#), ("safe", "1")])
        .await;
    assert_ok(&response);
    let status = response.get("status").expect("safe insert carries a status");
    assert_eq!(field(status, "err"), &Value::Null);
    assert_eq!(field(status, "ok"), &Value::Int(1));
}

#[tokio::test]
async fn test_duplicate_ids_fail_with_code_11000() {
    let ctx = TestContext::new().await;
    assert_ok(&ctx.insert("test", "c", r#"{"_id":1}"#).await);

    let response = ctx.insert("test", "c", r#"{"_id":1}"#).await;
    assert_eq!(response["ok"], Value::Int(0));
    assert_eq!(response["code"], Value::Int(11000));
    assert!(errmsg(&response).starts_with("E11000 duplicate key error"));
}

// ===== _find =====

#[tokio::test]
async fn test_find_sorts_descending_on_minus_one() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"[{"x":1},{"x":3},{"x":2}]"#).await;

    let found = ctx.find("test", "c", &[("sort", r#"{"x":-1}"#)]).await;
    let xs: Vec<&Value> = found.iter().map(|doc| field(doc, "x")).collect();
    assert_eq!(xs, vec![&Value::Int(3), &Value::Int(2), &Value::Int(1)]);
}

#[tokio::test]
async fn test_find_filters_skips_and_limits() {
    let ctx = TestContext::new().await;
    ctx.insert(
        "test",
        "c",
        r#"[{"n":1},{"n":2},{"n":3},{"n":4},{"n":5},{"n":6}]"#,
    )
    .await;

    let found = ctx
        .find(
            "test",
            "c",
            &[
                ("criteria", r#"{"n":{"$gt":1}}"#),
                ("sort", r#"{"n":1}"#),
                ("skip", "1"),
                ("limit", "3"),
            ],
        )
        .await;
    let ns: Vec<&Value> = found.iter().map(|doc| field(doc, "n")).collect();
    assert_eq!(ns, vec![&Value::Int(3), &Value::Int(4), &Value::Int(5)]);
}

#[tokio::test]
async fn test_find_projects_listed_fields() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"{"_id":1,"a":1,"b":2}"#).await;

    let found = ctx.find("test", "c", &[("fields", r#"["a"]"#)]).await;
    assert_eq!(found, vec![Value::from(doc! { "_id" => 1, "a" => 1 })]);
}

#[tokio::test]
async fn test_find_requires_get() {
    let ctx = TestContext::new().await;
    let response = ctx.post("/test/c/_find", &[]).await;
    assert_failed(&response, "_find must be a GET request");
}

#[tokio::test]
async fn test_find_rejects_a_non_numeric_limit() {
    let ctx = TestContext::new().await;
    let response = ctx.get("/test/c/_find", &[("limit", "ten")]).await;
    assert_failed(&response, "limit must be an integer");
}

#[tokio::test]
async fn test_explain_returns_a_plan_and_opens_no_cursor() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"[{"x":1},{"x":2}]"#).await;

    let response = ctx
        .get("/test/c/_find", &[("criteria", r#"{"x":1}"#), ("explain", "1")])
        .await;
    assert_ok(&response);
    let plans = results(&response);
    assert_eq!(plans.len(), 1);
    assert_eq!(field(&plans[0], "cursor"), &Value::from("BasicCursor"));
    assert_eq!(field(&plans[0], "n"), &Value::Int(1));
    assert!(response.get("id").is_none());
    assert!(ctx.state.cursors.is_empty());
}

// ===== _update =====

#[tokio::test]
async fn test_update_without_criteria_fails() {
    let ctx = TestContext::new().await;
    let response = ctx
        .post("/test/c/_update", &[("newobj", r#"{"$set":{"x":1}}"#)])
        .await;
    assert_failed(&response, "missing criteria");
}

#[tokio::test]
async fn test_update_without_newobj_fails() {
    let ctx = TestContext::new().await;
    let response = ctx.post("/test/c/_update", &[("criteria", "{}")]).await;
    assert_failed(&response, "missing newobj");
}

#[tokio::test]
async fn test_update_applies_modifiers() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"{"_id":1,"n":1}"#).await;

    let response = ctx
        .post(
            "/test/c/_update",
            &[("criteria", r#"{"_id":1}"#), ("newobj", r#"{"$inc":{"n":2}}"#)],
        )
        .await;
    assert_eq!(response, doc! { "ok" => 1 });

    let found = ctx.find("test", "c", &[]).await;
    assert_eq!(field(&found[0], "n"), &Value::Int(3));
}

#[tokio::test]
async fn test_safe_upsert_reports_the_new_id() {
    let ctx = TestContext::new().await;
    let response = ctx
        .post(
            "/test/c/_update",
            &[
                ("criteria", r#"{"_id":"k"}"#),
                ("newobj", r#"{"$set":{"v":1}}"#),
                ("upsert", "true"),
                ("safe", "1"),
            ],
        )
        .await;
    assert_ok(&response);
    assert_eq!(response["updatedExisting"], Value::Bool(false));
    assert_eq!(response["upserted"], Value::from("k"));
    assert_eq!(response["n"], Value::Int(1));

    let found = ctx.find("test", "c", &[]).await;
    assert_eq!(found, vec![Value::from(doc! { "_id" => "k", "v" => 1 })]);
}

#[tokio::test]
async fn test_multi_update_touches_every_match() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"[{"g":1},{"g":1},{"g":2}]"#).await;

    let response = ctx
        .post(
            "/test/c/_update",
            &[
                ("criteria", r#"{"g":1}"#),
                ("newobj", r#"{"$set":{"seen":true}}"#),
                ("multi", "1"),
                ("safe", "1"),
            ],
        )
        .await;
    assert_eq!(response["n"], Value::Int(2));
    assert_eq!(response["updatedExisting"], Value::Bool(true));

    let seen = ctx
        .find("test", "c", &[("criteria", r#"{"seen":true}"#)])
        .await;
    assert_eq!(seen.len(), 2);
}

// ===== _remove =====

#[tokio::test]
async fn test_remove_with_criteria() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"[{"x":1},{"x":2},{"x":2}]"#).await;

    let response = ctx
        .post("/test/c/_remove", &[("criteria", r#"{"x":2}"#), ("safe", "1")])
        .await;
    assert_ok(&response);
    assert_eq!(response["n"], Value::Int(2));
    assert_eq!(ctx.find("test", "c", &[]).await.len(), 1);
}

#[tokio::test]
async fn test_remove_without_criteria_empties_the_collection() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"[{"x":1},{"x":2}]"#).await;

    let response = ctx.post("/test/c/_remove", &[]).await;
    assert_eq!(response, doc! { "ok" => 1 });
    assert!(ctx.find("test", "c", &[]).await.is_empty());
}

// ===== _cmd =====

#[tokio::test]
async fn test_cmd_runs_against_admin_by_default() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"{"x":1}"#).await;

    let response = ctx
        .get("/_cmd", &[("cmd", r#"{"listDatabases":1}"#)])
        .await;
    assert_ok(&response);
    let Some(Value::Array(dbs)) = response.get("databases") else {
        panic!("listDatabases returned no databases: {response:?}");
    };
    assert!(dbs.iter().any(|db| field(db, "name") == &Value::from("test")));
}

#[tokio::test]
async fn test_cmd_counts_documents() {
    let ctx = TestContext::new().await;
    ctx.insert("test", "c", r#"[{"x":1},{"x":2},{"x":2}]"#).await;

    let response = ctx
        .post("/test/_cmd", &[("cmd", r#"{"count":"c","query":{"x":2}}"#)])
        .await;
    assert_ok(&response);
    assert_eq!(response["n"], Value::Int(2));
}

#[tokio::test]
async fn test_failed_cmd_echoes_the_command() {
    let ctx = TestContext::new().await;
    let cmd = r#"{"frobnicate":1}"#;
    let response = ctx.post("/test/_cmd", &[("cmd", cmd)]).await;
    assert_eq!(response["ok"], Value::Int(0));
    assert_eq!(response["cmd"], Value::from(cmd));
}
