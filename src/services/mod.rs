//! Long-running services and their lifecycle management.

pub mod manager;
pub mod refresh;
pub mod signals;
pub mod web;

use async_trait::async_trait;
use tokio::sync::broadcast;

/// A long-running component of the application.
#[async_trait]
pub trait Service: Send {
    /// Run until a shutdown signal arrives on `shutdown_rx`, cleaning up before returning.
    ///
    /// Returning early (with or without an error) is treated as a service failure.
    async fn run(&mut self, shutdown_rx: broadcast::Receiver<()>) -> Result<(), anyhow::Error>;
}
