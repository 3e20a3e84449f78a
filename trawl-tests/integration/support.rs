//! Shared builders for integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use trawl_core::FetchMode;
use trawl_search::testing::{ScriptedFetcher, StaticDriver};
use trawl_search::{
    DriverRegistry, FetchError, MediaSearchService, MediaType, SearchCache, SearchSettings,
    SourceDriver,
};

pub fn mock_settings() -> SearchSettings {
    SearchSettings {
        mode: FetchMode::Mock,
        fetch_timeout: Duration::from_secs(2),
        deadline: None,
        allow_empty_query_in_mock: false,
    }
}

pub fn service(
    drivers: Vec<Arc<dyn SourceDriver>>,
    fetcher: Arc<ScriptedFetcher>,
) -> MediaSearchService {
    service_with_cache(
        drivers,
        fetcher,
        Arc::new(SearchCache::new(Duration::from_secs(300))),
    )
}

pub fn service_with_cache(
    drivers: Vec<Arc<dyn SourceDriver>>,
    fetcher: Arc<ScriptedFetcher>,
    cache: Arc<SearchCache>,
) -> MediaSearchService {
    MediaSearchService::new(
        DriverRegistry::from_drivers(drivers).unwrap(),
        fetcher,
        cache,
        mock_settings(),
    )
}

/// Source A yields two videos, B yields none, C fails to fetch.
pub fn three_source_scenario() -> (MediaSearchService, Arc<ScriptedFetcher>) {
    let fetcher = Arc::new(ScriptedFetcher::new().fail(
        "SourceC",
        FetchError::Status {
            url: "https://static.example.com/sourcec/videos".to_string(),
            status: 500,
        },
    ));
    let drivers = vec![
        StaticDriver::new("SourceA")
            .with_generated(MediaType::Videos, 2)
            .into_arc(),
        StaticDriver::new("SourceB").into_arc(),
        StaticDriver::new("SourceC")
            .with_generated(MediaType::Videos, 3)
            .into_arc(),
    ];
    (service(drivers, Arc::clone(&fetcher)), fetcher)
}

/// Root of the repository, where the shipped catalogue and fixtures live.
pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
