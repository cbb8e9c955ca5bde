use crate::cli::ServiceName;
use crate::services::Service;
use crate::state::{AppState, ServiceStatus};
use crate::web::create_router;
use anyhow::Context;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

/// Serves the HTTP API until shutdown.
pub struct WebService {
    port: u16,
    app_state: AppState,
}

impl WebService {
    pub fn new(port: u16, app_state: AppState) -> Self {
        Self { port, app_state }
    }
}

#[async_trait]
impl Service for WebService {
    async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), anyhow::Error> {
        let name = ServiceName::Web.as_str();
        let statuses = self.app_state.service_statuses.clone();
        statuses.set(name, ServiceStatus::Starting);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                statuses.set(name, ServiceStatus::Error);
                return Err(e).with_context(|| format!("Failed to bind {addr}"));
            }
        };
        info!(address = %addr, "web server listening");
        statuses.set(name, ServiceStatus::Active);

        let router = create_router(self.app_state.clone());
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await;

        statuses.set(name, ServiceStatus::Disabled);
        served.context("Web server failed")
    }
}
