//! Fan-out, isolation, filtering and gating of aggregated searches.

use std::sync::Arc;
use std::time::Duration;

use trawl_search::testing::{ScriptedFetcher, StaticDriver};
use trawl_search::{
    FetchError, MediaSearchError, MediaType, SearchParams, SearchRequest, SourceDriver,
    SourceStatus,
};

use crate::support::{service, three_source_scenario};

#[tokio::test]
async fn test_failing_source_does_not_affect_others() {
    let (service, fetcher) = three_source_scenario();

    let report = service
        .search_with_report(&SearchRequest::new("harbor"))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|r| r.source == "SourceA"));
    assert_eq!(report.sources[0].status, SourceStatus::Ok);
    assert_eq!(report.sources[1].status, SourceStatus::Ok);
    assert_eq!(report.sources[1].count, 0);
    assert!(matches!(report.sources[2].status, SourceStatus::Failed(_)));
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_every_branch_failure_kind_is_contained() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .fail(
                "Slowpoke",
                FetchError::Timeout {
                    url: "https://static.example.com/slowpoke".to_string(),
                    timeout: Duration::from_secs(2),
                },
            )
            .fail(
                "Gone",
                FetchError::Status {
                    url: "https://static.example.com/gone".to_string(),
                    status: 404,
                },
            ),
    );
    let service = service(
        vec![
            StaticDriver::new("BadUrl")
                .with_generated(MediaType::Videos, 1)
                .failing_url_build()
                .into_arc(),
            StaticDriver::new("Slowpoke")
                .with_generated(MediaType::Videos, 1)
                .into_arc(),
            StaticDriver::new("Gone")
                .with_generated(MediaType::Videos, 1)
                .into_arc(),
            StaticDriver::new("Panicky").panicking_parse().into_arc(),
            StaticDriver::new("Healthy")
                .with_generated(MediaType::Videos, 3)
                .into_arc(),
        ],
        fetcher,
    );

    let report = service
        .search_with_report(&SearchRequest::new("anything"))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 3);
    let failed = report
        .sources
        .iter()
        .filter(|s| matches!(s.status, SourceStatus::Failed(_)))
        .count();
    assert_eq!(failed, 4);
}

#[tokio::test]
async fn test_blank_query_is_rejected_before_fan_out() {
    let (service, fetcher) = three_source_scenario();

    for query in ["", "   ", "\t\n"] {
        let result = service.search(&SearchRequest::new(query)).await;
        assert!(matches!(result, Err(MediaSearchError::EmptyQuery)));
    }
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_source_filter_matches_alias_and_case() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let service = service(
        vec![
            StaticDriver::new("Alpha")
                .with_generated(MediaType::Videos, 2)
                .into_arc(),
            StaticDriver::new("sex.com")
                .with_generated(MediaType::Videos, 1)
                .into_arc(),
        ],
        Arc::clone(&fetcher),
    );

    for filter in ["sexcom", "SEX.COM", "SexCom"] {
        let request = SearchRequest::new("cats").with_source(Some(filter));
        let results = service.search(&request).await.unwrap();
        assert_eq!(results.len(), 1, "filter {filter}");
        assert_eq!(results[0].source, "sex.com");
    }

    assert_eq!(fetcher.calls_for("Alpha"), 0);
}

#[tokio::test]
async fn test_unknown_source_filter_is_empty_not_error() {
    let (service, fetcher) = three_source_scenario();

    let request = SearchRequest::new("cats").with_source(Some("nowhere"));
    let report = service.search_with_report(&request).await.unwrap();

    assert!(report.results.is_empty());
    assert!(report.sources.is_empty());
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_all_filter_searches_every_source() {
    let (service, fetcher) = three_source_scenario();

    let request = SearchRequest::new("cats").with_source(Some("ALL"));
    service.search(&request).await.unwrap();

    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_unsupported_media_type_never_reaches_driver() {
    let videos_only = Arc::new(
        StaticDriver::new("VideosOnly")
            .with_media(true, false)
            .with_generated(MediaType::Videos, 2),
    );
    let gifs = Arc::new(StaticDriver::new("Gifs").with_generated(MediaType::Gifs, 2));
    let fetcher = Arc::new(ScriptedFetcher::new());
    let service = service(
        vec![
            videos_only.clone() as Arc<dyn SourceDriver>,
            gifs.clone() as Arc<dyn SourceDriver>,
        ],
        Arc::clone(&fetcher),
    );

    let request = SearchRequest::new("loop").with_media_type(MediaType::Gifs);
    let report = service.search_with_report(&request).await.unwrap();

    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|r| r.media_type == MediaType::Gifs));
    assert!(report.results.iter().all(|r| r.duration.is_none()));
    assert!(matches!(report.sources[0].status, SourceStatus::Skipped(_)));
    assert_eq!(videos_only.url_build_count(), 0);
    assert_eq!(videos_only.parse_count(), 0);
    assert_eq!(fetcher.calls_for("VideosOnly"), 0);
    assert_eq!(gifs.url_build_count(), 1);
}

#[tokio::test]
async fn test_invalid_pages_are_clamped_before_drivers_run() {
    let driver = Arc::new(StaticDriver::new("Pager").with_generated(MediaType::Videos, 1));
    let fetcher = Arc::new(ScriptedFetcher::new());
    let service = service(
        vec![driver.clone() as Arc<dyn SourceDriver>],
        Arc::clone(&fetcher),
    );

    let from_params = SearchRequest::from_params(&SearchParams {
        query: Some("cats".to_string()),
        page: Some("-5".to_string()),
        ..SearchParams::default()
    });
    let requests = [
        SearchRequest::new("cats").with_page(0),
        from_params,
        SearchRequest::new("dogs").with_page(-5),
    ];

    for request in &requests {
        assert_eq!(request.page, 1);
        service.search(request).await.unwrap();
    }

    // The first two requests share a cache key.
    let fetched = fetcher.requests();
    assert_eq!(fetched.len(), 2);
    assert!(fetched.iter().all(|r| r.page == 1));
    assert!(fetched.iter().all(|r| r.url.ends_with("page=1")));
}

#[tokio::test]
async fn test_results_follow_registration_order_not_completion_order() {
    let fetcher = Arc::new(ScriptedFetcher::new().delay("First", Duration::from_millis(60)));
    let service = service(
        vec![
            StaticDriver::new("First")
                .with_generated(MediaType::Videos, 2)
                .into_arc(),
            StaticDriver::new("Second")
                .with_generated(MediaType::Videos, 2)
                .into_arc(),
        ],
        fetcher,
    );

    let results = service.search(&SearchRequest::new("cats")).await.unwrap();

    let sources: Vec<_> = results.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["First", "First", "Second", "Second"]);
}

#[tokio::test]
async fn test_every_result_is_complete() {
    let (service, _) = three_source_scenario();

    let results = service.search(&SearchRequest::new("cats")).await.unwrap();

    for result in results {
        assert!(!result.title.is_empty());
        assert!(result.url.starts_with("https://"));
        assert!(!result.source.is_empty());
        assert_eq!(result.duration.as_deref(), Some("N/A"));
    }
}
