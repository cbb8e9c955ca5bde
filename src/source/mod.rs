//! Upstream story sources.
//!
//! The refresh loop only depends on [`StorySource`]; whether stories come from
//! the live Hacker News API or from synthetic data is decided at startup.

pub mod error;
pub mod hn;
pub mod json;
pub mod pool;
pub mod static_data;

pub use error::SourceError;
pub use hn::HackerNewsClient;
pub use pool::ClientPool;
pub use static_data::StaticDataClient;

use crate::story::{Story, StoryId};
use async_trait::async_trait;

/// A client able to list the current best story ids and fetch single stories.
///
/// Implementations must tolerate many concurrent in-flight calls: the pool
/// hands the same client to several fetch tasks at once. Dropping a returned
/// future cancels the request.
#[async_trait]
pub trait StorySource: Send + Sync {
    /// Ids ordered by the source's own ranking.
    async fn list_story_ids(&self) -> Result<Vec<StoryId>, SourceError>;

    async fn fetch_story(&self, id: StoryId) -> Result<Story, SourceError>;

    /// Release any held resources. Must be safe to call more than once.
    fn close(&self) {}
}
