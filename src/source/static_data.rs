//! Synthetic story source with a fixed, predictable data set.
//!
//! Used to exercise the service without network noise or upstream latency
//! variance. Every call sleeps for the configured delay first.

use crate::source::{SourceError, StorySource};
use crate::story::{Story, StoryId};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

/// Number of ids the live API returns from the best stories endpoint.
pub const STORIES_COUNT: usize = 200;

pub struct StaticDataClient {
    delay: Duration,
    count: usize,
}

impl StaticDataClient {
    pub fn new(delay: Duration) -> Self {
        Self::with_count(delay, STORIES_COUNT)
    }

    pub fn with_count(delay: Duration, count: usize) -> Self {
        Self { delay, count }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl StorySource for StaticDataClient {
    /// The integers `0..count`.
    async fn list_story_ids(&self) -> Result<Vec<StoryId>, SourceError> {
        self.pause().await;
        Ok((0..self.count as StoryId).collect())
    }

    /// Only the posting time varies, so values look like what the live API returns.
    async fn fetch_story(&self, id: StoryId) -> Result<Story, SourceError> {
        self.pause().await;
        if id >= self.count as StoryId {
            return Err(SourceError::NotFound(id));
        }
        Ok(Story::new(
            id,
            Some(format!("Test story with id: {id}")),
            Some("https://static/data/fake/url.html".to_owned()),
            Some("static data client".to_owned()),
            Utc::now().timestamp(),
            i32::try_from(id).unwrap_or(i32::MAX),
            0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_sequential_ids() {
        let client = StaticDataClient::with_count(Duration::ZERO, 5);
        assert_eq!(client.list_story_ids().await.unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn story_score_follows_id() {
        let client = StaticDataClient::new(Duration::ZERO);
        let story = client.fetch_story(42).await.unwrap();
        assert_eq!(story.id(), 42);
        assert_eq!(story.score(), 42);
        assert_eq!(story.title(), Some("Test story with id: 42"));
        assert_eq!(story.posted_by(), Some("static data client"));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let client = StaticDataClient::with_count(Duration::ZERO, 3);
        assert!(matches!(
            client.fetch_story(3).await,
            Err(SourceError::NotFound(3))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_wait_for_the_delay() {
        let client = StaticDataClient::with_count(Duration::from_millis(100), 1);
        let start = tokio::time::Instant::now();
        client.list_story_ids().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
