use crate::services::Service;
use crate::utils::fmt_duration;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

type ServiceExit = (&'static str, Result<(), anyhow::Error>);

/// Spawns registered services and coordinates their shutdown.
pub struct ServiceManager {
    registered: Vec<(&'static str, Box<dyn Service>)>,
    running: JoinSet<ServiceExit>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registered: Vec::new(),
            running: JoinSet::new(),
            shutdown_tx,
        }
    }

    pub fn register_service(&mut self, name: &'static str, service: Box<dyn Service>) {
        debug!(service = name, "Service registered");
        self.registered.push((name, service));
    }

    pub fn has_services(&self) -> bool {
        !self.registered.is_empty() || !self.running.is_empty()
    }

    /// Spawn every registered service on its own task.
    pub fn spawn_all(&mut self) {
        for (name, mut service) in self.registered.drain(..) {
            let shutdown_rx = self.shutdown_tx.subscribe();
            self.running.spawn(async move {
                let result = service.run(shutdown_rx).await;
                (name, result)
            });
            info!(service = name, "Service started");
        }
    }

    /// Wait until any running service exits on its own.
    ///
    /// Returns `None` when nothing is running.
    pub async fn wait_for_exit(&mut self) -> Option<ServiceExit> {
        match self.running.join_next().await? {
            Ok(exit) => Some(exit),
            Err(e) => Some(("unknown", Err(anyhow::anyhow!("service task failed: {e}")))),
        }
    }

    /// Signal every service to stop and wait up to `timeout` for them.
    ///
    /// Returns the number of services that did not finish cleanly in time.
    pub async fn shutdown(&mut self, timeout: Duration) -> usize {
        let start = Instant::now();
        let _ = self.shutdown_tx.send(());

        let mut failed = 0;
        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = self.running.join_next().await {
                match joined {
                    Ok((name, Ok(()))) => debug!(service = name, "Service stopped"),
                    Ok((name, Err(e))) => {
                        failed += 1;
                        error!(service = name, error = ?e, "Service stopped with error");
                    }
                    Err(e) => {
                        failed += 1;
                        error!(error = ?e, "Service task failed during shutdown");
                    }
                }
            }
        })
        .await;

        if drained.is_err() {
            let pending = self.running.len();
            warn!(
                pending,
                timeout = fmt_duration(timeout),
                "Services did not stop in time, aborting"
            );
            self.running.abort_all();
            failed += pending;
        } else {
            info!(
                duration = fmt_duration(start.elapsed()),
                "All services stopped"
            );
        }
        failed
    }
}
