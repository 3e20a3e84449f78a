//! Result caching across repeated searches.

use std::sync::Arc;
use std::time::Duration;

use trawl_search::testing::{ScriptedFetcher, StaticDriver};
use trawl_search::{MediaSearchError, MediaType, SearchCache, SearchRequest};

use crate::support::{service_with_cache, three_source_scenario};

#[tokio::test]
async fn test_repeated_search_is_served_from_cache() {
    let (service, fetcher) = three_source_scenario();
    let request = SearchRequest::new("harbor");

    let first = service.search_with_report(&request).await.unwrap();
    assert!(!first.cached);
    assert_eq!(fetcher.calls(), 3);

    let second = service.search_with_report(&request).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.results, first.results);
    assert_eq!(fetcher.calls(), 3);

    let stats = service.cache().statistics();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hit_count, 1);
    assert_eq!(stats.miss_count, 1);
}

#[tokio::test]
async fn test_degraded_results_are_cached() {
    let (service, fetcher) = three_source_scenario();
    let request = SearchRequest::new("harbor");

    service.search(&request).await.unwrap();
    let again = service.search(&request).await.unwrap();

    // The failing source is not retried until the entry expires.
    assert_eq!(again.len(), 2);
    assert_eq!(fetcher.calls_for("SourceC"), 1);
}

#[tokio::test]
async fn test_rejected_requests_are_not_cached() {
    let (service, _) = three_source_scenario();

    let result = service.search(&SearchRequest::new("  ")).await;

    assert!(matches!(result, Err(MediaSearchError::EmptyQuery)));
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_expired_entries_trigger_a_fresh_fan_out() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let service = service_with_cache(
        vec![
            StaticDriver::new("Alpha")
                .with_generated(MediaType::Videos, 2)
                .into_arc(),
        ],
        Arc::clone(&fetcher),
        Arc::new(SearchCache::new(Duration::from_millis(30))),
    );
    let request = SearchRequest::new("cats");

    service.search(&request).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let report = service.search_with_report(&request).await.unwrap();

    assert!(!report.cached);
    assert_eq!(report.results.len(), 2);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_zero_ttl_never_serves_from_cache() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let service = service_with_cache(
        vec![
            StaticDriver::new("Alpha")
                .with_generated(MediaType::Videos, 1)
                .into_arc(),
        ],
        Arc::clone(&fetcher),
        Arc::new(SearchCache::new(Duration::ZERO)),
    );
    let request = SearchRequest::new("cats");

    for _ in 0..3 {
        service.search(&request).await.unwrap();
    }

    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_each_key_component_separates_entries() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let service = service_with_cache(
        vec![
            StaticDriver::new("Alpha")
                .with_generated(MediaType::Videos, 2)
                .with_generated(MediaType::Gifs, 1)
                .into_arc(),
        ],
        Arc::clone(&fetcher),
        Arc::new(SearchCache::new(Duration::from_secs(60))),
    );

    let requests = [
        SearchRequest::new("cats"),
        SearchRequest::new("dogs"),
        SearchRequest::new("cats").with_page(2),
        SearchRequest::new("cats").with_media_type(MediaType::Gifs),
        SearchRequest::new("cats").with_source(Some("alpha")),
    ];
    for request in &requests {
        service.search(request).await.unwrap();
    }

    assert_eq!(fetcher.calls(), requests.len());
    assert_eq!(service.cache().len(), requests.len());

    let gifs = service
        .search(&SearchRequest::new("cats").with_media_type(MediaType::Gifs))
        .await
        .unwrap();
    assert_eq!(gifs.len(), 1);
    assert_eq!(fetcher.calls(), requests.len());
}
