//! Mock-mode searches replaying recorded pages through the real drivers.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use trawl_core::TrawlConfig;
use trawl_search::{MediaSearchError, MediaSearchService, MediaType, SearchRequest, SourceStatus};

use crate::support::workspace_root;

fn shipped_config() -> TrawlConfig {
    let root = workspace_root();
    let mut config = TrawlConfig::for_testing();
    config.search.drivers_file = root.join("drivers.json");
    config.fetch.fixtures_dir = root.join("fixtures");
    config
}

const TEMP_CATALOGUE: &str = r#"{
  "drivers": [
    {
      "kind": "html",
      "name": "Recorded",
      "base_url": "https://recorded.example.com",
      "search_urls": { "videos": "https://recorded.example.com/s?q={query}&p={page}" },
      "selectors": { "item": "article", "link": "a", "duration": "time" }
    },
    {
      "kind": "html",
      "name": "Unrecorded",
      "base_url": "https://unrecorded.example.com",
      "search_urls": { "videos": "https://unrecorded.example.com/s?q={query}&p={page}" },
      "selectors": { "item": "article", "link": "a" }
    }
  ]
}"#;

const RECORDED_PAGE: &str = r#"<html><body>
  <article><a href="/v/one">First recording</a><time>1:02:03</time></article>
  <article><a href="/v/two">Second recording</a></article>
</body></html>"#;

fn temp_config(dir: &Path) -> TrawlConfig {
    let catalogue = dir.join("drivers.json");
    fs::write(&catalogue, TEMP_CATALOGUE).unwrap();
    let recorded = dir.join("fixtures").join("recorded");
    fs::create_dir_all(&recorded).unwrap();
    fs::write(recorded.join("videos_page1.html"), RECORDED_PAGE).unwrap();

    let mut config = TrawlConfig::for_testing();
    config.search.drivers_file = catalogue;
    config.fetch.fixtures_dir = dir.join("fixtures");
    config
}

#[tokio::test]
async fn test_shipped_catalogue_replays_video_fixtures() {
    let service = MediaSearchService::load(&shipped_config()).await.unwrap();
    assert_eq!(service.driver_names(), vec!["ClipHarbor", "loop.tv", "ReelDepot"]);

    let report = service
        .search_with_report(&SearchRequest::new("cats"))
        .await
        .unwrap();

    let ids: Vec<_> = report.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["ch-1001", "ch-1002", "rd-1"]);
    assert!(matches!(report.sources[1].status, SourceStatus::Skipped(_)));

    let seals = &report.results[0];
    assert_eq!(seals.title, "Harbor seals at sunrise");
    assert_eq!(seals.url, "https://clipharbor.example.com/watch/ch-1001");
    assert_eq!(seals.duration.as_deref(), Some("04:12"));
    assert_eq!(
        seals.preview_video,
        "https://media.clipharbor.example.com/ch-1001/preview.webm"
    );

    let tide = &report.results[1];
    assert_eq!(tide.title, "Tide pool timelapse");
    assert_eq!(tide.preview_video, "");
    assert_eq!(tide.duration.as_deref(), Some("N/A"));

    let reel = &report.results[2];
    assert_eq!(reel.source, "ReelDepot");
    assert_eq!(reel.duration.as_deref(), Some("21:07"));
    assert!(reel.preview_video.ends_with("rd-1.mp4"));
}

#[tokio::test]
async fn test_shipped_catalogue_replays_gif_fixtures() {
    let service = MediaSearchService::load(&shipped_config()).await.unwrap();

    let request = SearchRequest::new("cats").with_media_type(MediaType::Gifs);
    let report = service.search_with_report(&request).await.unwrap();

    assert_eq!(report.results.len(), 4);
    assert!(matches!(report.sources[2].status, SourceStatus::Skipped(_)));
    assert!(report.results.iter().all(|r| r.media_type == MediaType::Gifs));
    assert!(report.results.iter().all(|r| r.duration.is_none()));

    let placeholder = report
        .results
        .iter()
        .find(|r| r.id == "5502")
        .unwrap();
    assert_eq!(placeholder.title, "loop.tv Content 2");
    assert_eq!(placeholder.url, "https://api.loop.example.net/l/5502");
    assert_eq!(placeholder.thumbnail, "");
    assert!(!report.results.iter().any(|r| r.id == "5503"));
}

#[tokio::test]
async fn test_loop_source_filter_by_alias() {
    let service = MediaSearchService::load(&shipped_config()).await.unwrap();

    let request = SearchRequest::new("cats")
        .with_media_type(MediaType::Gifs)
        .with_source(Some("LOOPTV"));
    let results = service.search(&request).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.source == "loop.tv"));
}

#[tokio::test]
async fn test_missing_fixture_fails_only_that_source() {
    let dir = TempDir::new().unwrap();
    let service = MediaSearchService::load(&temp_config(dir.path()))
        .await
        .unwrap();

    let report = service
        .search_with_report(&SearchRequest::new("anything"))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].duration.as_deref(), Some("1:02:03"));
    assert_eq!(report.results[0].url, "https://recorded.example.com/v/one");
    assert_eq!(report.sources[0].status, SourceStatus::Ok);
    assert!(matches!(report.sources[1].status, SourceStatus::Failed(_)));
}

#[tokio::test]
async fn test_missing_page_fixture_fails_the_source() {
    let dir = TempDir::new().unwrap();
    let service = MediaSearchService::load(&temp_config(dir.path()))
        .await
        .unwrap();

    let report = service
        .search_with_report(&SearchRequest::new("anything").with_page(2))
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert!(
        report
            .sources
            .iter()
            .all(|s| matches!(s.status, SourceStatus::Failed(_)))
    );
}

#[tokio::test]
async fn test_blank_query_replay_requires_opt_in() {
    let dir = TempDir::new().unwrap();
    let mut config = temp_config(dir.path());

    let service = MediaSearchService::load(&config).await.unwrap();
    let result = service.search(&SearchRequest::new("")).await;
    assert!(matches!(result, Err(MediaSearchError::EmptyQuery)));

    config.search.allow_empty_query_in_mock = true;
    let service = MediaSearchService::load(&config).await.unwrap();
    let results = service.search(&SearchRequest::new("")).await.unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_missing_catalogue_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    let mut config = TrawlConfig::for_testing();
    config.search.drivers_file = dir.path().join("absent.json");

    let result = MediaSearchService::load(&config).await;

    assert!(matches!(result, Err(MediaSearchError::CatalogError { .. })));
}
