//! Read path: top stories from the latest snapshot.
//!
//! Queries never touch the upstream source. Before the first snapshot is
//! published they wait on the readiness gate; afterwards they only load the
//! current snapshot pointer.

use crate::feed::StoryFeed;
use crate::story::Story;
use std::sync::Arc;

/// Payload for an empty result.
pub const EMPTY_PAYLOAD: &str = "[]";

/// Non-positive counts ask for nothing.
fn requested(count: i64) -> Option<usize> {
    if count <= 0 {
        return None;
    }
    Some(usize::try_from(count).unwrap_or(usize::MAX))
}

impl StoryFeed {
    /// Up to `count` stories ordered by descending score.
    pub async fn best_stories(&self, count: i64) -> Vec<Arc<Story>> {
        let Some(count) = requested(count) else {
            return Vec::new();
        };
        self.ready().await;
        self.snapshot().top(count).to_vec()
    }

    /// Up to `count` stories ordered by descending score, as a JSON array.
    ///
    /// Each story contributes its memoized serialized form.
    pub async fn best_stories_json(&self, count: i64) -> String {
        let Some(count) = requested(count) else {
            return EMPTY_PAYLOAD.to_owned();
        };
        self.ready().await;
        let snapshot = self.snapshot();
        render_json(snapshot.top(count))
    }
}

fn render_json(stories: &[Arc<Story>]) -> String {
    let size = stories.iter().map(|s| s.to_json().len() + 1).sum::<usize>() + 2;
    let mut out = String::with_capacity(size);
    out.push('[');
    for (i, story) in stories.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(story.to_json());
    }
    out.push(']');
    out
}
