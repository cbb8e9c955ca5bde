//! Web API router construction.

use axum::http::StatusCode;
use axum::{Router, middleware, routing::get};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::middleware::request_id::request_id;
use crate::web::{best, status};

/// Upper bound on a single request, including the wait for the first snapshot.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/best", get(best::best_stories))
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        // Outermost: per-request ID span and response logging.
        middleware::from_fn(request_id),
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT),
    ))
}
