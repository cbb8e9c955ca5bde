//! The refresh/cache/publish engine behind the best stories endpoint.
//!
//! [`StoryFeed`] is the explicitly owned service object: it holds the story
//! cache, the snapshot store, the readiness gate and the client pool, runs the
//! refresh loop in the background and answers queries from the latest
//! published snapshot.

pub mod cache;
pub mod gate;
pub mod query;
pub mod refresh;
pub mod snapshot;

pub use cache::StoryCache;
pub use gate::ReadinessGate;
pub use query::EMPTY_PAYLOAD;
pub use refresh::{CycleError, CycleReport, RefreshPhase, RefreshSettings};
pub use snapshot::{Snapshot, SnapshotStore};

use crate::source::ClientPool;
use chrono::{DateTime, Utc};
use refresh::Refresher;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// State shared between the refresh loop and readers.
pub(crate) struct FeedShared {
    pub(crate) cache: StoryCache,
    pub(crate) store: SnapshotStore,
    pub(crate) gate: ReadinessGate,
    pub(crate) pool: ClientPool,
    pub(crate) settings: RefreshSettings,
    pub(crate) phase: watch::Sender<RefreshPhase>,
}

/// Point-in-time view of the feed for the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub ready: bool,
    pub phase: RefreshPhase,
    pub snapshot_cycle: u64,
    pub snapshot_stories: usize,
    pub published_at: Option<DateTime<Utc>>,
    pub cached_stories: usize,
    pub cache_ttl_ms: u64,
    pub pool_size: usize,
}

pub struct StoryFeed {
    shared: Arc<FeedShared>,
    /// Running refresh task and its cancellation token.
    worker: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
    disposed: AtomicBool,
}

impl StoryFeed {
    pub fn new(settings: RefreshSettings, pool: ClientPool) -> Self {
        let (phase, _) = watch::channel(RefreshPhase::Idle);
        Self {
            shared: Arc::new(FeedShared {
                cache: StoryCache::new(settings.cache_ttl),
                store: SnapshotStore::new(),
                gate: ReadinessGate::new(),
                pool,
                settings,
                phase,
            }),
            worker: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    /// Spawn the refresh loop on the current tokio runtime.
    ///
    /// Returns `false` when the loop is already running or the feed was disposed.
    pub fn start(&self) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((handle, _)) = worker.as_ref()
            && !handle.is_finished()
        {
            return false;
        }

        let cancel = CancellationToken::new();
        let refresher = Refresher::new(self.shared.clone());
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move { refresher.run(cancel).await }
        });
        *worker = Some((handle, cancel));
        debug!("Refresh loop spawned");
        true
    }

    /// Cancel the refresh loop and wait for it to exit. Safe to call repeatedly.
    pub async fn stop(&self) {
        let running = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some((handle, cancel)) = running else {
            return;
        };

        cancel.cancel();
        if let Err(e) = handle.await
            && e.is_panic()
        {
            error!(error = ?e, "Refresh loop panicked");
        }
    }

    /// Stop the loop and release the client pool. Only the first call releases anything.
    pub async fn dispose(&self) {
        self.stop().await;
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.pool.close();
        info!("Story feed disposed");
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|(handle, _)| !handle.is_finished())
    }

    /// Whether a first snapshot has been published.
    pub fn is_ready(&self) -> bool {
        self.shared.gate.is_open()
    }

    /// Wait for the first published snapshot.
    pub async fn ready(&self) {
        self.shared.gate.wait().await;
    }

    /// The current snapshot, empty until the first cycle succeeds.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared.store.load()
    }

    pub fn cache(&self) -> &StoryCache {
        &self.shared.cache
    }

    pub fn pool(&self) -> &ClientPool {
        &self.shared.pool
    }

    pub fn phase(&self) -> RefreshPhase {
        *self.shared.phase.borrow()
    }

    pub fn status(&self) -> FeedStatus {
        let snapshot = self.snapshot();
        let ready = self.is_ready();
        FeedStatus {
            ready,
            phase: self.phase(),
            snapshot_cycle: snapshot.cycle,
            snapshot_stories: snapshot.len(),
            published_at: ready.then_some(snapshot.published_at),
            cached_stories: self.shared.cache.len(),
            cache_ttl_ms: self.shared.cache.ttl().as_millis() as u64,
            pool_size: self.shared.pool.size(),
        }
    }
}

impl Drop for StoryFeed {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some((_, cancel)) = worker {
            cancel.cancel();
        }
    }
}
