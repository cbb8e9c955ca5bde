//! Hacker News Firebase API client.

use crate::source::json::parse_json_with_context;
use crate::source::{SourceError, StorySource};
use crate::story::{Story, StoryId};
use anyhow::Context;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Connection settings shared by every client in the pool.
#[derive(Debug, Clone)]
pub struct HackerNewsConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Outbound requests per second for a single client; `None` disables limiting.
    pub rate_limit: Option<NonZeroU32>,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(10),
            rate_limit: None,
        }
    }
}

/// One HTTP client (and so one connection pool) to the Hacker News API.
pub struct HackerNewsClient {
    /// Emptied by [`StorySource::close`]; dropping the last handle frees the connections.
    http: ArcSwapOption<reqwest::Client>,
    base_url: String,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl HackerNewsClient {
    pub fn new(config: &HackerNewsConfig) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http: ArcSwapOption::from_pointee(http),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            limiter: config
                .rate_limit
                .map(|per_second| RateLimiter::direct(Quota::per_second(per_second))),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.http.load().is_none()
    }

    /// GET `url` and return the body of a successful response.
    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let http: Arc<reqwest::Client> = self.http.load_full().ok_or(SourceError::Closed)?;

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        trace!(url, "GET");
        let response = http
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Unavailable {
                url: url.to_owned(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        response
            .text()
            .await
            .map_err(|source| SourceError::Unavailable {
                url: url.to_owned(),
                source,
            })
    }
}

#[async_trait]
impl StorySource for HackerNewsClient {
    async fn list_story_ids(&self) -> Result<Vec<StoryId>, SourceError> {
        let url = format!("{}/beststories.json", self.base_url);
        let body = self.get_text(&url).await?;
        let ids: Vec<StoryId> = parse_json_with_context(&body)
            .map_err(|source| SourceError::Malformed { url, source })?;
        debug!(count = ids.len(), "Fetched best story ids");
        Ok(ids)
    }

    async fn fetch_story(&self, id: StoryId) -> Result<Story, SourceError> {
        let url = format!("{}/item/{id}.json", self.base_url);
        let body = self.get_text(&url).await?;
        // Unknown ids come back as a literal `null`.
        let story: Option<Story> = parse_json_with_context(&body)
            .map_err(|source| SourceError::Malformed { url, source })?;
        story.ok_or(SourceError::NotFound(id))
    }

    fn close(&self) {
        if self.http.swap(None).is_some() {
            debug!(base_url = %self.base_url, "Hacker News client closed");
        }
    }
}
