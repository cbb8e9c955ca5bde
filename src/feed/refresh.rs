//! The background refresh loop: list, resolve, publish, sleep.
//!
//! Every cycle is all-or-nothing. Ids are listed from the pool's primary
//! client, each id is resolved from the cache (against the cycle's start
//! instant) or fetched through the pool, and only when every story resolved is
//! a new snapshot published and the fresh fetches cached. A failing source
//! therefore degrades to serving the last good snapshot indefinitely.

use crate::feed::FeedShared;
use crate::feed::snapshot::Snapshot;
use crate::source::SourceError;
use crate::story::{Story, StoryId};
use crate::utils::fmt_duration;
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// The best stories endpoint never returns more than this many ids.
pub const MAX_STORIES: usize = 200;

/// Cycles slower than this are logged as warnings.
const SLOW_CYCLE_THRESHOLD: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
    pub cache_ttl: Duration,
    /// Upper bound on candidate ids taken from each listing.
    pub max_stories: usize,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            cache_ttl: DEFAULT_CACHE_TTL,
            max_stories: MAX_STORIES,
        }
    }
}

/// Where the loop currently is; reported on the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshPhase {
    Idle,
    Listing,
    FetchingFanOut,
    Publishing,
    Sleeping,
    Cancelling,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("Refresh cycle cancelled")]
    Cancelled,
}

/// Summary of a published cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    pub cycle: u64,
    pub stories: usize,
    pub fetched: usize,
    pub cached: usize,
    pub duration: Duration,
    /// Whether this cycle opened the readiness gate.
    pub first_publish: bool,
}

enum Resolved {
    Cached(Arc<Story>),
    Fetched(StoryId, Arc<Story>),
}

pub(crate) struct Refresher {
    shared: Arc<FeedShared>,
}

impl Refresher {
    pub(crate) fn new(shared: Arc<FeedShared>) -> Self {
        Self { shared }
    }

    fn enter(&self, phase: RefreshPhase) {
        trace!(?phase, "Refresh phase");
        self.shared.phase.send_replace(phase);
    }

    /// Runs cycles until `cancel` fires. A cancelled cycle publishes nothing.
    pub(crate) async fn run(&self, cancel: CancellationToken) {
        let settings = &self.shared.settings;
        info!(
            interval = fmt_duration(settings.interval),
            cache_ttl = fmt_duration(settings.cache_ttl),
            max_stories = settings.max_stories,
            pool_size = self.shared.pool.size(),
            "Refresh loop started"
        );

        let mut cycle: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                break;
            }

            cycle += 1;
            match self.run_cycle(cycle, &cancel).await {
                Ok(report) => Self::log_report(&report),
                Err(CycleError::Cancelled) => {
                    self.enter(RefreshPhase::Cancelling);
                    debug!(cycle, "Refresh cycle cancelled, nothing published");
                    break;
                }
                Err(CycleError::Source(e)) => {
                    error!(cycle, error = ?e, "Refresh cycle failed, keeping previous snapshot");
                }
            }

            // Listing and fan-out can outlast the delay, so check before sleeping too.
            if cancel.is_cancelled() {
                break;
            }

            self.enter(RefreshPhase::Sleeping);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = time::sleep(settings.interval) => {}
            }
            self.enter(RefreshPhase::Idle);
        }

        self.enter(RefreshPhase::Stopped);
        info!(cycles = cycle, "Refresh loop exiting gracefully");
    }

    pub(crate) async fn run_cycle(
        &self,
        cycle: u64,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, CycleError> {
        let started = Instant::now();
        let shared = &self.shared;

        self.enter(RefreshPhase::Listing);
        let mut ids = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CycleError::Cancelled),
            result = shared.pool.primary().list_story_ids() => result?,
        };
        ids.truncate(shared.settings.max_stories);
        // An empty ranking is never published; the previous snapshot stays.
        if ids.is_empty() {
            return Err(SourceError::EmptyListing.into());
        }

        // Dropping the join on cancel or on the first error drops every outstanding fetch.
        self.enter(RefreshPhase::FetchingFanOut);
        let resolved = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CycleError::Cancelled),
            result = try_join_all(
                ids.iter()
                    .enumerate()
                    .map(|(index, &id)| self.resolve(index, id, started)),
            ) => result?,
        };

        self.enter(RefreshPhase::Publishing);
        let mut fetched = 0;
        let stories: Vec<Arc<Story>> = resolved
            .into_iter()
            .map(|resolved| match resolved {
                Resolved::Cached(story) => story,
                Resolved::Fetched(id, story) => {
                    shared.cache.insert(id, story.clone(), started);
                    fetched += 1;
                    story
                }
            })
            .collect();

        let total = stories.len();
        shared.store.publish(Snapshot::new(cycle, stories));
        let first_publish = shared.gate.open();

        Ok(CycleReport {
            cycle,
            stories: total,
            fetched,
            cached: total - fetched,
            duration: started.elapsed(),
            first_publish,
        })
    }

    async fn resolve(
        &self,
        index: usize,
        id: StoryId,
        reference: Instant,
    ) -> Result<Resolved, SourceError> {
        if let Some(story) = self.shared.cache.lookup(id, reference) {
            return Ok(Resolved::Cached(story));
        }
        let story = self.shared.pool.client_for(index).fetch_story(id).await?;
        Ok(Resolved::Fetched(id, Arc::new(story)))
    }

    fn log_report(report: &CycleReport) {
        if report.duration > SLOW_CYCLE_THRESHOLD {
            warn!(
                cycle = report.cycle,
                duration = fmt_duration(report.duration),
                "Slow refresh cycle (upstream latency or rate limiting)"
            );
        }

        if report.first_publish {
            info!(
                cycle = report.cycle,
                stories = report.stories,
                duration = fmt_duration(report.duration),
                "First snapshot published, readers released"
            );
        } else if report.fetched > 0 {
            debug!(
                cycle = report.cycle,
                stories = report.stories,
                fetched = report.fetched,
                cached = report.cached,
                duration = fmt_duration(report.duration),
                "Snapshot published"
            );
        } else {
            trace!(
                cycle = report.cycle,
                stories = report.stories,
                duration = fmt_duration(report.duration),
                "Snapshot published from cache"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::StoryFeed;
    use crate::source::{ClientPool, StorySource};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Serves ids `0..count` with score = id; fetching `fail_id` errors while `failing` is set
    /// and the listing comes back empty while `empty` is set.
    struct ScriptedSource {
        count: u64,
        fail_id: StoryId,
        failing: AtomicBool,
        empty: AtomicBool,
        fetches: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(count: u64) -> Arc<Self> {
            Arc::new(Self {
                count,
                fail_id: 3,
                failing: AtomicBool::new(false),
                empty: AtomicBool::new(false),
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl StorySource for ScriptedSource {
        async fn list_story_ids(&self) -> Result<Vec<StoryId>, SourceError> {
            if self.empty.load(Ordering::SeqCst) {
                return Ok(Vec::new());
            }
            Ok((0..self.count).collect())
        }

        async fn fetch_story(&self, id: StoryId) -> Result<Story, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if id == self.fail_id && self.failing.load(Ordering::SeqCst) {
                return Err(SourceError::NotFound(id));
            }
            Ok(Story::new(id, None, None, None, 0, id as i32, 0))
        }
    }

    fn feed(source: &Arc<ScriptedSource>, settings: RefreshSettings) -> (StoryFeed, Refresher) {
        let pool = ClientPool::new(vec![source.clone() as Arc<dyn StorySource>]).unwrap();
        let feed = StoryFeed::new(settings, pool);
        let refresher = Refresher::new(feed.shared.clone());
        (feed, refresher)
    }

    #[tokio::test]
    async fn publishes_and_opens_gate() {
        let source = ScriptedSource::new(10);
        let (feed, refresher) = feed(&source, RefreshSettings::default());

        let report = refresher
            .run_cycle(1, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.first_publish);
        assert_eq!(report.stories, 10);
        assert_eq!(report.fetched, 10);
        assert!(feed.is_ready());
        assert_eq!(feed.snapshot().cycle, 1);
        assert_eq!(feed.snapshot().stories()[0].score(), 9);
        assert_eq!(feed.cache().len(), 10);
    }

    #[tokio::test]
    async fn second_cycle_is_served_from_cache() {
        let source = ScriptedSource::new(10);
        let (_feed, refresher) = feed(&source, RefreshSettings::default());
        let cancel = CancellationToken::new();

        refresher.run_cycle(1, &cancel).await.unwrap();
        let report = refresher.run_cycle(2, &cancel).await.unwrap();

        assert!(!report.first_publish);
        assert_eq!(report.fetched, 0);
        assert_eq!(report.cached, 10);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn failed_fetch_discards_whole_cycle() {
        let source = ScriptedSource::new(10);
        let (feed, refresher) = feed(&source, RefreshSettings::default());
        source.failing.store(true, Ordering::SeqCst);

        let result = refresher.run_cycle(1, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(CycleError::Source(SourceError::NotFound(3)))
        ));
        assert!(!feed.is_ready());
        assert!(feed.snapshot().is_empty());
        assert!(feed.cache().is_empty());
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_snapshot() {
        let source = ScriptedSource::new(10);
        let settings = RefreshSettings {
            cache_ttl: Duration::ZERO,
            ..RefreshSettings::default()
        };
        let (feed, refresher) = feed(&source, settings);
        let cancel = CancellationToken::new();

        refresher.run_cycle(1, &cancel).await.unwrap();
        source.failing.store(true, Ordering::SeqCst);
        // Zero TTL forces refetching, so the failing id is hit again.
        std::thread::sleep(Duration::from_millis(2));
        assert!(refresher.run_cycle(2, &cancel).await.is_err());

        assert!(feed.is_ready());
        assert_eq!(feed.snapshot().cycle, 1);
        assert_eq!(feed.snapshot().len(), 10);
    }

    #[tokio::test]
    async fn empty_listing_never_opens_gate() {
        let source = ScriptedSource::new(10);
        let (feed, refresher) = feed(&source, RefreshSettings::default());
        source.empty.store(true, Ordering::SeqCst);

        let result = refresher.run_cycle(1, &CancellationToken::new()).await;

        assert!(matches!(
            result,
            Err(CycleError::Source(SourceError::EmptyListing))
        ));
        assert!(!feed.is_ready());
        assert!(feed.snapshot().is_empty());
    }

    #[tokio::test]
    async fn empty_listing_keeps_previous_snapshot() {
        let source = ScriptedSource::new(10);
        let (feed, refresher) = feed(&source, RefreshSettings::default());
        let cancel = CancellationToken::new();

        refresher.run_cycle(1, &cancel).await.unwrap();
        let before = feed.best_stories_json(2).await;

        source.empty.store(true, Ordering::SeqCst);
        assert!(refresher.run_cycle(2, &cancel).await.is_err());

        assert_eq!(feed.snapshot().cycle, 1);
        assert_eq!(feed.snapshot().len(), 10);
        assert_eq!(feed.best_stories_json(2).await, before);
    }

    #[tokio::test]
    async fn listing_is_truncated_to_max_stories() {
        let source = ScriptedSource::new(50);
        let settings = RefreshSettings {
            max_stories: 20,
            ..RefreshSettings::default()
        };
        let (feed, refresher) = feed(&source, settings);

        refresher
            .run_cycle(1, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(feed.snapshot().len(), 20);
        assert_eq!(feed.snapshot().stories()[0].score(), 19);
    }

    #[tokio::test]
    async fn cancelled_cycle_publishes_nothing() {
        let source = ScriptedSource::new(10);
        let (feed, refresher) = feed(&source, RefreshSettings::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = refresher.run_cycle(1, &cancel).await;

        assert!(matches!(result, Err(CycleError::Cancelled)));
        assert!(!feed.is_ready());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_stops_on_cancel() {
        let source = ScriptedSource::new(4);
        let (feed, refresher) = feed(&source, RefreshSettings::default());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { refresher.run(cancel).await }
        });
        feed.ready().await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(feed.phase(), RefreshPhase::Stopped);
    }
}
