// tests/integration/http_test.rs

//! HTTP-level tests driving the router directly
//! Tests: routing, status codes, form bodies, JSONP, cross-origin headers

use super::test_helpers::TestContext;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use docgate::config::Config;
use docgate::server::http::router;
use tower::ServiceExt;

async fn send(ctx: &TestContext, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = router(ctx.state.clone())
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body must be readable");
    (status, headers, String::from_utf8_lossy(&body).into_owned())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_hello_over_http() {
    let ctx = TestContext::new().await;
    let (status, headers, body) = send(&ctx, get("/_hello")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(body.starts_with(r#"{"ok":1,"msg":"#));
    assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_paths_without_an_operation_are_not_found() {
    let ctx = TestContext::new().await;
    let (status, _, body) = send(&ctx, get("/foo")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Script Not Found: foo");
}

#[tokio::test]
async fn test_unknown_operations_are_not_found() {
    let ctx = TestContext::new().await;
    let (status, _, body) = send(&ctx, get("/test/c/_drop")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Script Not Found: test/c/_drop");
}

#[tokio::test]
async fn test_other_methods_are_not_allowed() {
    let ctx = TestContext::new().await;
    let request = Request::delete("/_hello").body(Body::empty()).unwrap();
    let (status, _, _) = send(&ctx, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_form_posts_then_query_gets() {
    let ctx = TestContext::new().await;
    let (status, _, body) = send(
        &ctx,
        post_form("/test/c/_insert", "docs=%5B%7B%22_id%22%3A7%7D%5D"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"oids":[7],"ok":1}"#);

    let (_, _, body) = send(&ctx, get("/test/c/_find")).await;
    assert_eq!(body, r#"{"results":[{"_id":7}],"id":0,"ok":1}"#);
}

#[tokio::test]
async fn test_failures_are_envelopes_with_status_200() {
    let ctx = TestContext::new().await;
    let (status, _, body) = send(&ctx, post_form("/test/c/_insert", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":0,"errmsg":"missing docs"}"#);
}

#[tokio::test]
async fn test_jsonp_callback_wraps_the_body() {
    let ctx = TestContext::new().await;
    let (_, _, body) = send(&ctx, get("/_status?callback=show")).await;
    assert_eq!(body, r#"show({"ok":1,"connections":{"default":"localhost:27017"}})"#);
}

#[tokio::test]
async fn test_jsonp_callback_must_be_an_identifier() {
    let ctx = TestContext::new().await;
    let (status, _, body) = send(&ctx, get("/_status?callback=x%3Cscript%3Ealert%281%29")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"ok":0,"errmsg":"invalid JSONP callback name"}"#);
}

#[tokio::test]
async fn test_multipart_bodies_are_rejected() {
    let ctx = TestContext::new().await;
    let request = Request::post("/test/c/_insert")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
        .body(Body::from("--x--"))
        .unwrap();
    let (status, _, body) = send(&ctx, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(r#"{"ok":0"#));
}

#[tokio::test]
async fn test_cross_origin_header_when_enabled() {
    let config = Config {
        cross_origin: true,
        ..Config::default()
    };
    let ctx = TestContext::with_config(config).await;
    let (_, headers, _) = send(&ctx, get("/_hello")).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let (status, headers, _) = send(&ctx, get("/nothing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_percent_encoded_paths_are_decoded() {
    let ctx = TestContext::new().await;
    send(&ctx, post_form("/my%20db/c/_insert", "docs=%7B%7D")).await;
    let status = ctx.get("/_cmd", &[("cmd", r#"{"listDatabases":1}"#)]).await;
    let rendered = docgate::core::protocol::ext_json::encode_document(&status);
    assert!(rendered.contains(r#""name":"my db""#));
}

#[tokio::test]
async fn test_batch_over_http_renders_an_array() {
    let ctx = TestContext::new().await;
    let requests = super::test_helpers::encode_pairs(&[(
        "requests",
        r#"[{"cmd":"_hello"},{"cmd":"_more","args":{"id":"5"}}]"#,
    )]);
    let (_, _, body) = send(&ctx, post_form("/_batch", &requests)).await;
    assert!(body.starts_with(r#"[{"ok":1,"msg":"#));
    assert!(body.ends_with(r#"{"ok":0,"errmsg":"couldn't find the cursor with id 5"}]"#));
}
