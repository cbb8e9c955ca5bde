//! Fixed-size round-robin pool of story source clients.

use crate::source::StorySource;
use anyhow::bail;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Upstream connection setup is slow, so a couple of warm clients serve
/// best as a steady state.
pub const DEFAULT_POOL_SIZE: usize = 2;

/// A small set of interchangeable clients.
///
/// Fetch tasks are assigned by index (`task_index % size`), not by
/// availability, so several tasks share each client concurrently.
pub struct ClientPool {
    clients: Vec<Arc<dyn StorySource>>,
    closed: AtomicBool,
}

impl ClientPool {
    pub fn new(clients: Vec<Arc<dyn StorySource>>) -> Result<Self, anyhow::Error> {
        if clients.is_empty() {
            bail!("Client pool needs at least one client");
        }
        Ok(Self {
            clients,
            closed: AtomicBool::new(false),
        })
    }

    /// Build `size` independent clients from `factory`.
    pub fn from_factory<F>(size: usize, mut factory: F) -> Result<Self, anyhow::Error>
    where
        F: FnMut() -> Result<Arc<dyn StorySource>, anyhow::Error>,
    {
        let clients = (0..size)
            .map(|_| factory())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(clients)
    }

    pub fn size(&self) -> usize {
        self.clients.len()
    }

    /// The client used for listing candidate ids.
    pub fn primary(&self) -> &Arc<dyn StorySource> {
        &self.clients[0]
    }

    pub fn client_for(&self, task_index: usize) -> &Arc<dyn StorySource> {
        &self.clients[task_index % self.clients.len()]
    }

    /// Close every member. Only the first call does anything; returns whether it was this one.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        for client in &self.clients {
            client.close();
        }
        debug!(size = self.clients.len(), "Client pool closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
