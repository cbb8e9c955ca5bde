//! Atomically published result sets.

use crate::story::Story;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::sync::Arc;

/// The immutable result of one successful refresh cycle, ordered by
/// non-increasing score. Ties keep the upstream ranking order.
#[derive(Debug)]
pub struct Snapshot {
    stories: Vec<Arc<Story>>,
    /// Refresh cycle that produced this snapshot; 0 for the initial empty one.
    pub cycle: u64,
    pub published_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(cycle: u64, mut stories: Vec<Arc<Story>>) -> Self {
        stories.sort_by_key(|story| Reverse(story.score()));
        Self {
            stories,
            cycle,
            published_at: Utc::now(),
        }
    }

    fn empty() -> Self {
        Self {
            stories: Vec::new(),
            cycle: 0,
            published_at: Utc::now(),
        }
    }

    pub fn stories(&self) -> &[Arc<Story>] {
        &self.stories
    }

    /// The `count` highest scoring stories.
    pub fn top(&self, count: usize) -> &[Arc<Story>] {
        &self.stories[..count.min(self.stories.len())]
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }
}

/// Holds the current snapshot. One writer swaps it; readers load it without locking.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }

    /// The current snapshot. The caller keeps it alive for as long as it needs it,
    /// regardless of later publications.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }
}
