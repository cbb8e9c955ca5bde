//! Request spans keyed by a request ID.
//!
//! An incoming `X-Request-Id` is reused when a proxy already assigned one,
//! otherwise a ULID is generated. Handlers can fill in the span's empty
//! fields (`/api/best` records the requested count) and the response is
//! logged once, inside the span, with its status and latency.

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use tracing::field::Empty;
use tracing::{Instrument, debug, info_span, warn};

pub const REQUEST_ID: &str = "x-request-id";

/// Longest incoming ID we accept before generating our own.
const MAX_INCOMING_LEN: usize = 128;

fn resolve_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_INCOMING_LEN)
        .map(String::from)
        .unwrap_or_else(|| ulid::Ulid::new().to_string())
}

/// `axum::middleware::from_fn` handler wrapping every API request.
pub async fn request_id(request: Request, next: Next) -> Response {
    let req_id = resolve_request_id(request.headers());
    let span = info_span!(
        "request",
        req_id = %req_id,
        method = %request.method(),
        path = request.uri().path(),
        count = Empty,
    );

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let status = response.status();
    span.in_scope(|| {
        if status.is_server_error() {
            warn!(status = status.as_u16(), duration_ms, "Response");
        } else {
            debug!(status = status.as_u16(), duration_ms, "Response");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&req_id) {
        response.headers_mut().insert(REQUEST_ID, value);
    }
    response
}
