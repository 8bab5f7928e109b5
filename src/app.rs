use std::sync::Arc;

use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::cache::CorpusCache;
use crate::config::Config;
use crate::corpus::CorpusAssembler;
use crate::fetcher::HttpBulletinFetcher;
use crate::scheduler;
use crate::services::{ClimateService, RefreshService};

/// Application with all spawned background tasks and server
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub refresh_scheduler_handle: Option<JoinHandle<()>>,
}

impl Application {
    /// Build and initialize the application
    ///
    /// This creates the fetcher, assembler, cache and services, and spawns:
    /// - HTTP API server (Axum)
    /// - Refresh scheduler, when a refresh interval is configured
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let stations = config.stations()?;
        info!("Configured {} stations", stations.len());

        let fetcher = HttpBulletinFetcher::new(config.fetch_timeout())?;
        let assembler = CorpusAssembler::new(Arc::new(fetcher))
            .with_concurrency(config.fetch_concurrency)
            .with_fetch_timeout(config.fetch_timeout());

        let refresh_service = RefreshService::new(assembler, stations, config.export_settings());
        let cache = CorpusCache::new(config.cache_ttl());
        let climate_service = ClimateService::new(cache, refresh_service);

        let refresh_scheduler_handle = match config.refresh_interval() {
            Some(period) => {
                let service = climate_service.clone();
                Some(tokio::spawn(async move {
                    scheduler::start_refresh_scheduler(service, period).await;
                }))
            }
            None => {
                info!("Refresh scheduler disabled, corpus is assembled on first request");
                None
            }
        };

        let app_state = AppState { climate_service };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            refresh_scheduler_handle,
        })
    }

    /// Run until the server stops (which runs indefinitely unless error)
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
