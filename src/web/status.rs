//! Health and status handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::trace;

use crate::feed::FeedStatus;
use crate::state::{AppState, ServiceStatus};

#[derive(Serialize)]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    services: BTreeMap<String, ServiceInfo>,
    feed: FeedStatus,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Status endpoint showing service and feed state
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut services = BTreeMap::new();

    for (name, svc_status) in state.service_statuses.all() {
        services.insert(
            name.clone(),
            ServiceInfo {
                name,
                status: svc_status,
            },
        );
    }

    Json(StatusResponse {
        status: overall_status(services.values().map(|s| &s.status)),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        services,
        feed: state.feed.status(),
    })
}

fn overall_status<'a>(statuses: impl Iterator<Item = &'a ServiceStatus>) -> ServiceStatus {
    let statuses: Vec<_> = statuses.collect();
    if statuses.iter().any(|s| matches!(s, ServiceStatus::Error)) {
        ServiceStatus::Error
    } else if statuses.is_empty() {
        ServiceStatus::Disabled
    } else if statuses.iter().any(|s| matches!(s, ServiceStatus::Starting)) {
        ServiceStatus::Starting
    } else {
        ServiceStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overall_status_prefers_errors() {
        let all = [ServiceStatus::Active, ServiceStatus::Error, ServiceStatus::Starting];
        assert_eq!(overall_status(all.iter()), ServiceStatus::Error);
    }

    #[test]
    fn overall_status_waits_for_starting_services() {
        let all = [ServiceStatus::Active, ServiceStatus::Starting];
        assert_eq!(overall_status(all.iter()), ServiceStatus::Starting);
        assert_eq!(overall_status([ServiceStatus::Active].iter()), ServiceStatus::Active);
        assert_eq!(overall_status(std::iter::empty()), ServiceStatus::Disabled);
    }
}
