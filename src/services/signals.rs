use crate::services::manager::ServiceManager;
use crate::utils::fmt_duration;
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Block until Ctrl+C, SIGTERM, or a service exiting on its own, then shut everything down.
pub async fn handle_shutdown_signals(
    mut manager: ServiceManager,
    shutdown_timeout: Duration,
) -> ExitCode {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let mut exit_code = ExitCode::SUCCESS;

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
        exited = manager.wait_for_exit() => match exited {
            Some((name, Ok(()))) => {
                warn!(service = name, "Service exited unexpectedly, shutting down");
                exit_code = ExitCode::FAILURE;
            }
            Some((name, Err(e))) => {
                error!(service = name, error = ?e, "Service failed, shutting down");
                exit_code = ExitCode::FAILURE;
            }
            None => warn!("No services running, shutting down"),
        },
    }

    info!(
        timeout = fmt_duration(shutdown_timeout),
        "Waiting for services to stop"
    );
    let failed = manager.shutdown(shutdown_timeout).await;
    if failed > 0 {
        warn!(failed, "Some services did not shut down cleanly");
        exit_code = ExitCode::FAILURE;
    }

    exit_code
}
