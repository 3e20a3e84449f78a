//! JSON API server for Trawl
//!
//! The listener starts immediately; the driver catalogue loads in the
//! background and requests answer 503 until it is ready.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use axum::Router;
use axum::routing::get;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use trawl_core::{FetchMode, TrawlConfig, TrawlError};
use trawl_search::{MediaSearchService, SearchCache};

use crate::handlers::{api_drivers, api_health, api_search};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    search: Arc<OnceLock<Result<MediaSearchService, String>>>,
    pub mode: FetchMode,
    pub server_started_at: Instant,
}

/// Lifecycle of the search service behind the API.
#[derive(Debug)]
pub enum Readiness<'a> {
    /// The catalogue is still loading.
    Starting,
    Ready(&'a MediaSearchService),
    /// Initialization failed; the service will not become available.
    Failed(&'a str),
}

impl AppState {
    /// State whose search service is not available yet.
    pub fn initializing(mode: FetchMode) -> Self {
        Self {
            search: Arc::new(OnceLock::new()),
            mode,
            server_started_at: Instant::now(),
        }
    }

    /// State with a ready search service.
    pub fn ready(service: MediaSearchService) -> Self {
        let state = Self::initializing(service.mode());
        state.install(service);
        state
    }

    /// Publishes the search service; later calls are ignored.
    pub fn install(&self, service: MediaSearchService) {
        self.settle(Ok(service));
    }

    /// Records that the search service could not be built.
    pub fn fail(&self, reason: impl Into<String>) {
        self.settle(Err(reason.into()));
    }

    fn settle(&self, outcome: Result<MediaSearchService, String>) {
        if self.search.set(outcome).is_err() {
            tracing::warn!("Search service already settled, ignoring replacement");
        }
    }

    pub fn readiness(&self) -> Readiness<'_> {
        match self.search.get() {
            None => Readiness::Starting,
            Some(Ok(service)) => Readiness::Ready(service),
            Some(Err(reason)) => Readiness::Failed(reason),
        }
    }

    pub fn search_service(&self) -> Option<&MediaSearchService> {
        match self.readiness() {
            Readiness::Ready(service) => Some(service),
            _ => None,
        }
    }
}

/// Builds the API router around `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(api_search))
        .route("/api/drivers", get(api_drivers))
        .route("/api/health", get(api_health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Runs the API server until the listener fails.
///
/// # Errors
/// - `TrawlError::Io` - The address cannot be bound or serving fails
pub async fn run_server(config: TrawlConfig) -> Result<(), TrawlError> {
    let state = AppState::initializing(config.mode);
    spawn_service_init(state.clone(), config.clone());

    let app = router(state);
    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        "Trawl API listening on http://{} ({} mode)",
        address,
        config.mode
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Loads the catalogue and installs the service without blocking startup.
fn spawn_service_init(state: AppState, config: TrawlConfig) {
    tokio::spawn(async move {
        match MediaSearchService::load(&config).await {
            Ok(service) => {
                if let Some(every) = config.cache.sweep_interval.filter(|d| !d.is_zero()) {
                    spawn_cache_sweep(Arc::clone(service.cache()), every);
                }
                tracing::info!(
                    "Search ready with sources: {}",
                    service.driver_names().join(", ")
                );
                state.install(service);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to initialize search from {}: {}",
                    config.search.drivers_file.display(),
                    e
                );
                state.fail(e.to_string());
            }
        }
    });
}

/// Periodically drops stale cache entries.
pub fn spawn_cache_sweep(cache: Arc<SearchCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired();
            tracing::debug!(
                "Cache sweep removed {} entries, {} remain",
                purged,
                cache.len()
            );
        }
    })
}
