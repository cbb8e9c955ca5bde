use crate::cli::ServiceName;
use crate::config::{Config, SourceKind};
use crate::feed::StoryFeed;
use crate::services::manager::ServiceManager;
use crate::services::refresh::RefreshService;
use crate::services::web::WebService;
use crate::source::{ClientPool, HackerNewsClient, StaticDataClient, StorySource};
use crate::state::AppState;
use crate::utils::fmt_duration;
use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
    service_manager: ServiceManager,
}

impl App {
    /// Create a new App instance with all necessary components initialized
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let pool = Self::build_pool(&config).context("Failed to create client pool")?;

        info!(
            source = ?config.story_source,
            pool_size = pool.size(),
            refresh_interval = fmt_duration(config.refresh_interval),
            cache_ttl = fmt_duration(config.cache_ttl),
            max_stories = config.max_stories,
            "story feed configured"
        );

        let feed = Arc::new(StoryFeed::new(config.refresh_settings(), pool));
        let app_state = AppState::new(feed);

        Ok(App {
            config,
            app_state,
            service_manager: ServiceManager::new(),
        })
    }

    fn build_pool(config: &Config) -> Result<ClientPool, anyhow::Error> {
        match config.story_source {
            SourceKind::Live => {
                let hn = config.hacker_news();
                ClientPool::from_factory(config.pool_size, || {
                    Ok(Arc::new(HackerNewsClient::new(&hn)?) as Arc<dyn StorySource>)
                })
            }
            SourceKind::Static => {
                let delay = config.static_delay;
                ClientPool::from_factory(config.pool_size, || {
                    Ok(Arc::new(StaticDataClient::new(delay)) as Arc<dyn StorySource>)
                })
            }
        }
    }

    /// Setup and register services based on enabled service list
    pub fn setup_services(&mut self, services: &[ServiceName]) -> Result<(), anyhow::Error> {
        if services.contains(&ServiceName::Refresh) {
            let refresh_service = Box::new(RefreshService::new(
                self.app_state.feed.clone(),
                self.app_state.service_statuses.clone(),
            ));
            self.service_manager
                .register_service(ServiceName::Refresh.as_str(), refresh_service);
        }

        if services.contains(&ServiceName::Web) {
            let web_service = Box::new(WebService::new(self.config.port, self.app_state.clone()));
            self.service_manager
                .register_service(ServiceName::Web.as_str(), web_service);
        }

        if !self.service_manager.has_services() {
            error!("No services enabled. Cannot start application.");
            return Err(anyhow::anyhow!("No services enabled"));
        }

        Ok(())
    }

    /// Start all registered services
    pub fn start_services(&mut self) {
        self.service_manager.spawn_all();
    }

    /// Run the application and handle shutdown signals
    pub async fn run(self) -> ExitCode {
        use crate::services::signals::handle_shutdown_signals;
        let exit_code =
            handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout).await;
        // The refresh service disposes the feed on a clean stop; this covers an aborted one.
        self.app_state.feed.dispose().await;
        exit_code
    }
}
