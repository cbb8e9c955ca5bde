use beststories::app::App;
use beststories::cli::{Args, ServiceName};
use beststories::config::Config;
use beststories::logging::setup_logging;
use clap::Parser;
use std::process::ExitCode;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Always run all services
    let enabled_services = ServiceName::all();

    // Load config and setup logging before App::new() so startup logs are never silently dropped
    let config = Config::load().expect("Failed to load config");
    setup_logging(&config, args.tracing);

    info!(
        enabled_services = ?enabled_services,
        "services configuration loaded"
    );

    // Log application startup context
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        commit = env!("GIT_COMMIT_SHORT"),
        "starting beststories"
    );

    let mut app = App::new(config).expect("Failed to initialize application");

    app.setup_services(&enabled_services)
        .expect("Failed to setup services");

    // Start all services and run the application
    app.start_services();
    app.run().await
}
