//! HTTP API behavior over the full router.

use std::sync::Arc;

use axum::http::StatusCode;
use trawl_core::{FetchMode, TrawlConfig};
use trawl_search::testing::{ScriptedFetcher, StaticDriver};
use trawl_search::{MediaSearchService, MediaType};
use trawl_web::{AppState, router};

use crate::support::{get_json, service, three_source_scenario, workspace_root};

fn scenario_app() -> axum::Router {
    let (service, _) = three_source_scenario();
    router(AppState::ready(service))
}

#[tokio::test]
async fn test_search_returns_results_from_healthy_sources() {
    let (status, body) = get_json(scenario_app(), "/api/search?query=harbor").await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|item| item["source"] == "SourceA"));
    assert_eq!(data[0]["type"], "videos");
    assert_eq!(data[0]["duration"], "N/A");
    assert_eq!(
        body["message"],
        "Found 2 videos for 'harbor' (page 1, source all) [MOCK]"
    );
}

#[tokio::test]
async fn test_invalid_inputs_fall_back_to_defaults() {
    let (status, body) =
        get_json(scenario_app(), "/api/search?q=harbor&type=photos&page=-5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["message"],
        "Found 2 videos for 'harbor' (page 1, source all) [MOCK]"
    );

    let (status, body) = get_json(scenario_app(), "/api/search?q=harbor&page=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("(page 1,"));
}

#[tokio::test]
async fn test_source_and_driver_parameters_filter() {
    let (status, body) =
        get_json(scenario_app(), "/api/search?query=harbor&source=sourcea").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["message"],
        "Found 2 videos for 'harbor' (page 1, source sourcea) [MOCK]"
    );

    let (status, body) =
        get_json(scenario_app(), "/api/search?query=harbor&driver=SOURCEB").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::json!([]));

    let (status, body) = get_json(scenario_app(), "/api/search?query=harbor&source=nope").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_blank_query_is_a_client_error() {
    for uri in ["/api/search", "/api/search?query=", "/api/search?query=%09%20"] {
        let (status, body) = get_json(scenario_app(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["data"], serde_json::json!([]));
        assert!(!body["message"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_requests_before_initialization_are_unavailable() {
    let app = router(AppState::initializing(FetchMode::Mock));

    let (status, body) = get_json(app.clone(), "/api/search?query=cats").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["data"], serde_json::json!([]));

    let (status, _) = get_json(app, "/api/drivers").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_service_installed_after_start_is_picked_up() {
    let state = AppState::initializing(FetchMode::Mock);
    let app = router(state.clone());

    let (status, _) = get_json(app.clone(), "/api/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (service, _) = three_source_scenario();
    state.install(service);

    let (status, body) = get_json(app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sources"], 3);
}

#[tokio::test]
async fn test_fixture_backed_gif_search_over_http() {
    let root = workspace_root();
    let mut config = TrawlConfig::for_testing();
    config.search.drivers_file = root.join("drivers.json");
    config.fetch.fixtures_dir = root.join("fixtures");
    let service = MediaSearchService::load(&config).await.unwrap();
    let app = router(AppState::ready(service));

    let (status, body) = get_json(app, "/api/search?q=otters&type=GIFS").await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 4);
    assert!(data.iter().all(|item| item["type"] == "gifs"));
    assert!(data.iter().all(|item| item.get("duration").is_none()));
}

#[tokio::test]
async fn test_parser_panic_in_one_source_still_answers_ok() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let service = service(
        vec![
            StaticDriver::new("SourceA")
                .with_generated(MediaType::Videos, 2)
                .into_arc(),
            StaticDriver::new("SourceB").into_arc(),
            StaticDriver::new("SourceC")
                .with_generated(MediaType::Videos, 3)
                .panicking_parse()
                .into_arc(),
        ],
        Arc::clone(&fetcher),
    );
    let app = router(AppState::ready(service));

    let (status, body) = get_json(app, "/api/search?query=harbor").await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert!(data.iter().all(|item| item["source"] == "SourceA"));
    assert_eq!(fetcher.calls_for("SourceC"), 1);
}

#[tokio::test]
async fn test_failed_catalogue_load_is_not_reported_as_starting() {
    let state = AppState::initializing(FetchMode::Mock);
    let app = router(state.clone());

    let mut config = TrawlConfig::for_testing();
    config.search.drivers_file = workspace_root().join("no-such-catalogue.json");
    let error = MediaSearchService::load(&config).await.unwrap_err();
    state.fail(error.to_string());

    let (status, body) = get_json(app.clone(), "/api/search?query=cats").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_ne!(body["message"], "Search service is still starting up");
    assert_eq!(body["data"], serde_json::json!([]));

    let (status, body) = get_json(app, "/api/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_live_mode_is_named_in_message() {
    let (service, _) = three_source_scenario();
    let mut settings = service.settings().clone();
    settings.mode = FetchMode::Live;
    let live = MediaSearchService::new(
        service.registry().clone(),
        Arc::new(ScriptedFetcher::new()),
        Arc::clone(service.cache()),
        settings,
    );

    let (status, body) = get_json(router(AppState::ready(live)), "/api/search?q=harbor").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().ends_with("[LIVE]"));
}
