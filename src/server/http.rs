// src/server/http.rs

//! The HTTP surface: every path is handled by one fallback handler that routes it,
//! normalizes the arguments and hands the call to the dispatcher.

use crate::core::GatewayError;
use crate::core::handler::args::Args;
use crate::core::handler::dispatcher::{Dispatcher, RoutedCall};
use crate::core::handler::reply::wrap_jsonp;
use crate::core::handler::router::route_path;
use crate::core::metrics;
use crate::core::protocol::ext_json;
use crate::core::state::GatewayState;
use axum::Router;
use axum::extract::State;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Builds the gateway's router.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .fallback(handle_request)
        .with_state(Dispatcher::new(state))
}

async fn handle_request(
    State(dispatcher): State<Dispatcher>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let state = dispatcher.state().clone();
    state.stats.record_request();
    let cross_origin = state.config.cross_origin;

    let Ok(_permit) = state.request_permits.clone().acquire_owned().await else {
        return finish(
            (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response(),
            cross_origin,
        );
    };
    let _in_flight = InFlight::enter();
    let response = serve(&dispatcher, method, uri, &headers, &body).await;
    finish(response, cross_origin)
}

/// Counts a request in the in-flight gauge until dropped, including when the client
/// goes away and the handler future is dropped mid-request.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        metrics::IN_FLIGHT_REQUESTS.inc();
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        metrics::IN_FLIGHT_REQUESTS.dec();
    }
}

async fn serve(
    dispatcher: &Dispatcher,
    method: Method,
    uri: Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    let path = urlencoding::decode(uri.path())
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| uri.path().to_string());
    debug!("{} {}", method, path);

    let args = if method == Method::GET {
        Args::from_query_string(uri.query().unwrap_or_default())
    } else if method == Method::POST {
        if is_multipart(headers) {
            let err = GatewayError::invalid("multipart/form-data bodies are not supported");
            return json_response(ext_json::encode_document(&err.into_envelope()));
        }
        Args::from_form_body(body)
    } else {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(ALLOW, "GET, POST")],
            "method not allowed",
        )
            .into_response();
    };

    let call = match route_path(&path) {
        Ok(route) => RoutedCall::from_route(route, args),
        Err(e) => return not_found(&e.to_string()),
    };
    let call = match call {
        Ok(call) => call,
        Err(_) => return not_found(&format!("Script Not Found: {}", path.trim_matches('/'))),
    };

    let callback = call.args.get("callback").map(str::to_string);
    let body = dispatcher.dispatch(&call).await.render();
    match callback.map(|callback| wrap_jsonp(&callback, &body)) {
        Some(Ok(wrapped)) => json_response(wrapped),
        Some(Err(e)) => json_response(ext_json::encode_document(&e.into_envelope())),
        None => json_response(body),
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("multipart/form-data"))
}

fn json_response(body: String) -> Response {
    (StatusCode::OK, [(CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response()
}

fn not_found(message: &str) -> Response {
    metrics::UNROUTED_REQUESTS_TOTAL.inc();
    warn!("{}", message);
    (StatusCode::NOT_FOUND, message.to_string()).into_response()
}

fn finish(mut response: Response, cross_origin: bool) -> Response {
    if cross_origin {
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
    response
}
