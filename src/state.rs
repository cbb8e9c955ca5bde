//! Application state shared across components (web handlers, services).

use crate::feed::StoryFeed;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Health status of a service.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Starting,
    Active,
    Disabled,
    Error,
}

/// A timestamped status entry for a service.
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub status: ServiceStatus,
    pub updated_at: Instant,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, StatusEntry>>,
}

impl ServiceStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(
            name.to_owned(),
            StatusEntry {
                status,
                updated_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<ServiceStatus> {
        self.inner.get(name).map(|entry| entry.status.clone())
    }

    /// Returns a snapshot of all service statuses.
    pub fn all(&self) -> Vec<(String, ServiceStatus)> {
        self.inner
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().status.clone()))
            .collect()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<StoryFeed>,
    pub service_statuses: ServiceStatusRegistry,
}

impl AppState {
    pub fn new(feed: Arc<StoryFeed>) -> Self {
        Self {
            feed,
            service_statuses: ServiceStatusRegistry::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_latest_status() {
        let registry = ServiceStatusRegistry::new();
        assert_eq!(registry.get("web"), None);

        registry.set("web", ServiceStatus::Starting);
        registry.set("web", ServiceStatus::Active);
        registry.set("refresh", ServiceStatus::Starting);

        assert_eq!(registry.get("web"), Some(ServiceStatus::Active));
        let mut all = registry.all();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            all,
            vec![
                ("refresh".to_owned(), ServiceStatus::Starting),
                ("web".to_owned(), ServiceStatus::Active),
            ]
        );
    }
}
