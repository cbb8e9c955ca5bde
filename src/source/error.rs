//! Error types for upstream story sources.

use crate::story::StoryId;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Upstream request to {url} failed")]
    Unavailable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Upstream returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Failed to parse response from {url}")]
    Malformed {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Upstream listing returned no stories")]
    EmptyListing,
    #[error("Story {0} not found")]
    NotFound(StoryId),
    #[error("Source client has been closed")]
    Closed,
}
