//! Time-boxed per-story cache with lazy eviction.
//!
//! Entries are only ever removed when a lookup finds them stale; there is no
//! background sweep. Ids that drop out of the ranking and are never looked up
//! again stay resident, which is acceptable because the candidate universe is
//! small (a few hundred ids) and changes slowly.

use crate::story::{Story, StoryId};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub story: Arc<Story>,
    pub fetched_at: Instant,
}

impl CacheEntry {
    /// Fresh iff `reference - fetched_at <= ttl`. An entry stamped after the
    /// reference instant counts as fresh.
    pub fn is_fresh(&self, reference: Instant, ttl: Duration) -> bool {
        reference.saturating_duration_since(self.fetched_at) <= ttl
    }
}

pub struct StoryCache {
    /// story id → (story, fetch instant)
    entries: DashMap<StoryId, CacheEntry>,
    ttl: Duration,
}

impl StoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached story if it is fresh relative to `reference`.
    ///
    /// A stale entry is evicted and reported as a miss.
    pub fn lookup(&self, id: StoryId, reference: Instant) -> Option<Arc<Story>> {
        {
            let entry = self.entries.get(&id)?;
            if entry.is_fresh(reference, self.ttl) {
                return Some(entry.story.clone());
            }
        }

        // Re-check under the shard lock so a concurrent fresh insert survives.
        let ttl = self.ttl;
        if self
            .entries
            .remove_if(&id, |_, entry| !entry.is_fresh(reference, ttl))
            .is_some()
        {
            trace!(id, "Evicted stale story");
        }
        None
    }

    /// Insert unless an entry for `id` already exists. Returns whether the insert took effect.
    pub fn insert(&self, id: StoryId, story: Arc<Story>, fetched_at: Instant) -> bool {
        match self.entries.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(CacheEntry { story, fetched_at });
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
