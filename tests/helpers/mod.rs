#![allow(dead_code)]

use async_trait::async_trait;
use beststories::feed::{RefreshSettings, StoryFeed};
use beststories::source::{ClientPool, SourceError, StorySource};
use beststories::story::{Story, StoryId};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// In-memory source whose calls can be held until the test releases them.
///
/// Story `i` has score `(i * 37) % count`, so ids arrive out of score order
/// while every score stays distinct.
pub struct ControlledSource {
    count: usize,
    released: watch::Sender<bool>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl ControlledSource {
    pub fn new(count: usize) -> Arc<Self> {
        Self::build(count, true)
    }

    /// A source whose calls hang until [`ControlledSource::release`].
    pub fn blocked(count: usize) -> Arc<Self> {
        Self::build(count, false)
    }

    fn build(count: usize, released: bool) -> Arc<Self> {
        let (released, _) = watch::channel(released);
        Arc::new(Self {
            count,
            released,
            list_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub fn release(&self) {
        self.released.send_replace(true);
    }

    pub fn block(&self) {
        self.released.send_replace(false);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn score_of(&self, id: StoryId) -> i32 {
        ((id as usize * 37) % self.count) as i32
    }

    async fn wait_released(&self) {
        let mut rx = self.released.subscribe();
        let _ = rx.wait_for(|released| *released).await;
    }
}

#[async_trait]
impl StorySource for ControlledSource {
    async fn list_story_ids(&self) -> Result<Vec<StoryId>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_released().await;
        Ok((0..self.count as StoryId).collect())
    }

    async fn fetch_story(&self, id: StoryId) -> Result<Story, SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_released().await;
        if id as usize >= self.count {
            return Err(SourceError::NotFound(id));
        }
        Ok(Story::new(
            id,
            Some(format!("story {id}")),
            Some(format!("https://example.com/{id}")),
            Some("tester".to_owned()),
            1_700_000_000 + id as i64,
            self.score_of(id),
            id as i32,
        ))
    }

    fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn settings(interval: Duration) -> RefreshSettings {
    RefreshSettings {
        interval,
        ..RefreshSettings::default()
    }
}

/// A feed over a single-client pool of `source`.
pub fn feed_over(source: &Arc<ControlledSource>, settings: RefreshSettings) -> StoryFeed {
    let pool = ClientPool::new(vec![source.clone() as Arc<dyn StorySource>])
        .expect("pool with one client");
    StoryFeed::new(settings, pool)
}

/// Scores are strictly descending.
pub fn assert_descending(scores: &[i32]) {
    assert!(
        scores.windows(2).all(|w| w[0] > w[1]),
        "scores not descending: {scores:?}"
    );
}
