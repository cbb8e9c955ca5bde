//! `GET /api/best`

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{Span, trace};

use crate::state::AppState;

pub const DEFAULT_COUNT: i64 = 10;

fn default_count() -> i64 {
    DEFAULT_COUNT
}

#[derive(Debug, Deserialize)]
pub struct BestParams {
    #[serde(default = "default_count")]
    pub n: i64,
}

/// Top `n` stories by score as a JSON array.
///
/// Holds the request until the first snapshot is published.
pub(super) async fn best_stories(
    State(state): State<AppState>,
    Query(params): Query<BestParams>,
) -> Response {
    Span::current().record("count", params.n);
    trace!("best stories requested");
    let body = state.feed.best_stories_json(params.n).await;
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}
