use crate::cli::ServiceName;
use crate::feed::StoryFeed;
use crate::services::Service;
use crate::state::{ServiceStatus, ServiceStatusRegistry};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Drives the story feed's background refresh loop for the lifetime of the process.
pub struct RefreshService {
    feed: Arc<StoryFeed>,
    statuses: ServiceStatusRegistry,
}

impl RefreshService {
    pub fn new(feed: Arc<StoryFeed>, statuses: ServiceStatusRegistry) -> Self {
        Self { feed, statuses }
    }
}

#[async_trait]
impl Service for RefreshService {
    async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), anyhow::Error> {
        let name = ServiceName::Refresh.as_str();
        self.statuses.set(name, ServiceStatus::Starting);

        if !self.feed.start() {
            self.statuses.set(name, ServiceStatus::Error);
            anyhow::bail!("refresh loop could not be started");
        }

        let mut ready = false;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = self.feed.ready(), if !ready => {
                    ready = true;
                    self.statuses.set(name, ServiceStatus::Active);
                    info!("Story feed is ready");
                }
            }
        }

        self.feed.dispose().await;
        self.statuses.set(name, ServiceStatus::Disabled);
        Ok(())
    }
}
