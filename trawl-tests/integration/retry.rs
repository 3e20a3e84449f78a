//! Transient fetch failures retried through the search service.

use std::sync::Arc;
use std::time::Duration;

use trawl_search::testing::{ScriptedFetcher, StaticDriver, unavailable};
use trawl_search::{
    DriverRegistry, FetchError, MediaSearchService, MediaType, RetryPolicy, RetryingFetcher,
    SearchCache, SearchRequest, SourceStatus,
};

use crate::support::mock_settings;

const POLICY: RetryPolicy = RetryPolicy {
    max_attempts: 3,
    base_delay: Duration::from_millis(1),
    max_delay: Duration::from_millis(5),
};

fn retrying_service(fetcher: &Arc<ScriptedFetcher>) -> MediaSearchService {
    let registry = DriverRegistry::from_drivers([
        StaticDriver::new("Flaky")
            .with_generated(MediaType::Videos, 2)
            .into_arc(),
        StaticDriver::new("Steady")
            .with_generated(MediaType::Videos, 1)
            .into_arc(),
    ])
    .unwrap();
    MediaSearchService::new(
        registry,
        Arc::new(RetryingFetcher::new(fetcher.clone(), POLICY)),
        Arc::new(SearchCache::new(Duration::from_secs(60))),
        mock_settings(),
    )
}

#[tokio::test]
async fn test_transient_failures_recover_within_budget() {
    let fetcher = Arc::new(ScriptedFetcher::new().fail_first(
        "Flaky",
        2,
        unavailable("https://static.example.com/flaky"),
    ));
    let service = retrying_service(&fetcher);

    let report = service
        .search_with_report(&SearchRequest::new("cats"))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 3);
    assert!(report.sources.iter().all(|s| s.status == SourceStatus::Ok));
    assert_eq!(fetcher.calls_for("Flaky"), 3);
    assert_eq!(fetcher.calls_for("Steady"), 1);
}

#[tokio::test]
async fn test_exhausted_retries_fail_only_that_source() {
    let fetcher = Arc::new(ScriptedFetcher::new().fail(
        "Flaky",
        FetchError::Timeout {
            url: "https://static.example.com/flaky".to_string(),
            timeout: Duration::from_secs(2),
        },
    ));
    let service = retrying_service(&fetcher);

    let report = service
        .search_with_report(&SearchRequest::new("cats"))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(matches!(report.sources[0].status, SourceStatus::Failed(_)));
    assert_eq!(fetcher.calls_for("Flaky"), POLICY.max_attempts as usize);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let fetcher = Arc::new(ScriptedFetcher::new().fail(
        "Flaky",
        FetchError::Status {
            url: "https://static.example.com/flaky".to_string(),
            status: 404,
        },
    ));
    let service = retrying_service(&fetcher);

    let report = service
        .search_with_report(&SearchRequest::new("cats"))
        .await
        .unwrap();

    assert!(matches!(report.sources[0].status, SourceStatus::Failed(_)));
    assert_eq!(fetcher.calls_for("Flaky"), 1);
}

#[tokio::test]
async fn test_rate_limiting_is_retried() {
    let fetcher = Arc::new(ScriptedFetcher::new().fail_first(
        "Steady",
        1,
        FetchError::Status {
            url: "https://static.example.com/steady".to_string(),
            status: 429,
        },
    ));
    let service = retrying_service(&fetcher);

    let results = service.search(&SearchRequest::new("cats")).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(fetcher.calls_for("Steady"), 2);
}
