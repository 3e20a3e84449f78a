//! Aggregated media search across every registered source.
//!
//! One search fans out to all candidate drivers at once, isolates each
//! driver's failures, and concatenates the surviving results in registration
//! order. Results are memoized per (source filter, media type, query, page).

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Serialize;
use trawl_core::{FetchMode, TrawlConfig};

use crate::cache::{CacheKey, SearchCache};
use crate::drivers::{SourceDriver, load_catalog};
use crate::errors::MediaSearchError;
use crate::fetch::{
    FetchAdapter, FetchRequest, FixtureFetcher, HttpFetcher, RetryPolicy, RetryingFetcher,
};
use crate::normalize::{NormalizeDefaults, normalize_all};
use crate::registry::DriverRegistry;
use crate::request::SearchRequest;
use crate::types::{MediaResult, ParseContext};

/// Runtime knobs of the aggregator.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub mode: FetchMode,
    /// Per-fetch timeout handed to the adapter
    pub fetch_timeout: Duration,
    /// Overall deadline; unfinished sources count as timed out
    pub deadline: Option<Duration>,
    /// Accept blank queries in mock mode so fixtures can be replayed
    pub allow_empty_query_in_mock: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::from_config(&TrawlConfig::default())
    }
}

impl SearchSettings {
    pub fn from_config(config: &TrawlConfig) -> Self {
        Self {
            mode: config.mode,
            fetch_timeout: config.fetch.timeout,
            deadline: config.search.deadline,
            allow_empty_query_in_mock: config.search.allow_empty_query_in_mock,
        }
    }

    fn accepts_empty_query(&self) -> bool {
        self.mode.is_mock() && self.allow_empty_query_in_mock
    }
}

/// How one source contributed to a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Skipped(String),
    Failed(String),
    TimedOut,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Skipped(reason) => write!(f, "skipped ({reason})"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}

/// Per-source line of a [`SearchReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub name: String,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub count: usize,
}

/// Results of one search together with what each source did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub results: Vec<MediaResult>,
    /// Empty when the answer came from the cache
    pub sources: Vec<SourceReport>,
    pub cached: bool,
}

struct SourceOutcome {
    results: Vec<MediaResult>,
    status: SourceStatus,
}

impl SourceOutcome {
    fn ok(results: Vec<MediaResult>) -> Self {
        Self {
            results,
            status: SourceStatus::Ok,
        }
    }

    fn skipped(reason: String) -> Self {
        Self {
            results: Vec::new(),
            status: SourceStatus::Skipped(reason),
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            results: Vec::new(),
            status: SourceStatus::Failed(reason),
        }
    }

    fn timed_out() -> Self {
        Self {
            results: Vec::new(),
            status: SourceStatus::TimedOut,
        }
    }
}

#[derive(Debug)]
struct ServiceInner {
    registry: DriverRegistry,
    fetcher: Arc<dyn FetchAdapter>,
    cache: Arc<SearchCache>,
    settings: SearchSettings,
}

/// Media search service aggregating every registered source.
///
/// Cheap to clone; clones share the registry, fetcher and cache.
#[derive(Debug, Clone)]
pub struct MediaSearchService {
    inner: Arc<ServiceInner>,
}

impl MediaSearchService {
    pub fn new(
        registry: DriverRegistry,
        fetcher: Arc<dyn FetchAdapter>,
        cache: Arc<SearchCache>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                registry,
                fetcher,
                cache,
                settings,
            }),
        }
    }

    /// Wires the fetch adapter matching `config.mode` around `registry`.
    ///
    /// Live mode uses HTTP with retry; mock mode reads fixtures.
    ///
    /// # Errors
    /// - `MediaSearchError::Configuration` - The HTTP client cannot be built
    pub fn from_config(
        config: &TrawlConfig,
        registry: DriverRegistry,
    ) -> Result<Self, MediaSearchError> {
        let fetcher: Arc<dyn FetchAdapter> = match config.mode {
            FetchMode::Live => {
                let http: Arc<dyn FetchAdapter> = Arc::new(HttpFetcher::new(&config.fetch)?);
                Arc::new(RetryingFetcher::new(
                    http,
                    RetryPolicy::from_config(&config.fetch.retry),
                ))
            }
            FetchMode::Mock => Arc::new(FixtureFetcher::new(&config.fetch.fixtures_dir)),
        };

        tracing::info!(
            "Search service ready in {} mode with {} sources",
            config.mode,
            registry.len()
        );

        Ok(Self::new(
            registry,
            fetcher,
            Arc::new(SearchCache::from_config(&config.cache)),
            SearchSettings::from_config(config),
        ))
    }

    /// Loads the driver catalogue named in `config` and builds the service.
    ///
    /// # Errors
    /// - `MediaSearchError::CatalogError` - The catalogue cannot be read
    /// - `MediaSearchError::InvalidDriver` - A catalogue entry is invalid
    /// - `MediaSearchError::DuplicateDriver` - Two entries share a name
    /// - `MediaSearchError::Configuration` - The HTTP client cannot be built
    pub async fn load(config: &TrawlConfig) -> Result<Self, MediaSearchError> {
        let drivers = load_catalog(&config.search.drivers_file).await?;
        let registry = DriverRegistry::from_drivers(drivers)?;
        Self::from_config(config, registry)
    }

    pub fn mode(&self) -> FetchMode {
        self.inner.settings.mode
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.inner.settings
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.inner.registry
    }

    /// Registered source names in fan-out order.
    pub fn driver_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.inner.cache
    }

    /// Searches and returns the concatenated results only.
    ///
    /// # Errors
    /// - `MediaSearchError::EmptyQuery` - Blank query outside fixture replay
    pub async fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<MediaResult>, MediaSearchError> {
        Ok(self.search_with_report(request).await?.results)
    }

    /// Searches every candidate source and reports each one's outcome.
    ///
    /// Source failures are absorbed into the report; only request validation
    /// fails the call.
    ///
    /// # Errors
    /// - `MediaSearchError::EmptyQuery` - Blank query outside fixture replay
    pub async fn search_with_report(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchReport, MediaSearchError> {
        if !request.has_query() && !self.inner.settings.accepts_empty_query() {
            return Err(MediaSearchError::EmptyQuery);
        }

        let key = CacheKey::from_request(request);
        if let Some(payload) = self.inner.cache.get(&key) {
            return Ok(SearchReport {
                results: payload.as_ref().clone(),
                sources: Vec::new(),
                cached: true,
            });
        }

        let started = Instant::now();
        let candidates = self.candidates(request);
        let outcomes = self.fan_out(&candidates, request).await;

        let mut results = Vec::new();
        let mut sources = Vec::with_capacity(candidates.len());
        for (driver, outcome) in candidates.iter().zip(outcomes) {
            sources.push(SourceReport {
                name: driver.name().to_string(),
                status: outcome.status,
                count: outcome.results.len(),
            });
            results.extend(outcome.results);
        }

        tracing::info!(
            "Search '{}' ({}, page {}, source {}): {} results from {} sources in {:?}",
            request.query,
            request.media_type,
            request.page,
            request.source_label(),
            results.len(),
            sources.iter().filter(|s| s.count > 0).count(),
            started.elapsed()
        );

        self.inner.cache.put(key, Arc::new(results.clone()));

        Ok(SearchReport {
            results,
            sources,
            cached: false,
        })
    }

    fn candidates(&self, request: &SearchRequest) -> Vec<Arc<dyn SourceDriver>> {
        let registry = &self.inner.registry;
        match request.source.as_deref() {
            None => registry.all().to_vec(),
            Some(filter) => match registry.resolve(filter) {
                Some(driver) => vec![Arc::clone(driver)],
                None => {
                    tracing::info!("No source matches filter '{}'", filter);
                    Vec::new()
                }
            },
        }
    }

    /// Runs every branch concurrently; outcomes come back in candidate order.
    async fn fan_out(
        &self,
        candidates: &[Arc<dyn SourceDriver>],
        request: &SearchRequest,
    ) -> Vec<SourceOutcome> {
        let mut pending: FuturesUnordered<_> = candidates
            .iter()
            .enumerate()
            .map(|(position, driver)| async move {
                (position, self.run_branch(driver.as_ref(), request).await)
            })
            .collect();

        let mut outcomes: Vec<Option<SourceOutcome>> =
            std::iter::repeat_with(|| None).take(candidates.len()).collect();

        match self.inner.settings.deadline {
            None => {
                while let Some((position, outcome)) = pending.next().await {
                    outcomes[position] = Some(outcome);
                }
            }
            Some(deadline) => {
                let expired = tokio::time::sleep(deadline);
                tokio::pin!(expired);
                loop {
                    tokio::select! {
                        next = pending.next() => match next {
                            Some((position, outcome)) => outcomes[position] = Some(outcome),
                            None => break,
                        },
                        () = &mut expired => {
                            tracing::warn!(
                                "Search deadline of {:?} reached with {} sources pending",
                                deadline,
                                pending.len()
                            );
                            break;
                        }
                    }
                }
            }
        }

        outcomes
            .into_iter()
            .map(|outcome| outcome.unwrap_or_else(SourceOutcome::timed_out))
            .collect()
    }

    async fn run_branch(
        &self,
        driver: &dyn SourceDriver,
        request: &SearchRequest,
    ) -> SourceOutcome {
        let name = driver.name();
        let media_type = request.media_type;

        if !driver.supports(media_type) {
            tracing::debug!("Skipping {}: does not serve {}", name, media_type);
            return SourceOutcome::skipped(format!("does not serve {media_type}"));
        }

        let url = if request.has_query() {
            match driver.build_search_url(&request.query, request.page, media_type) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("{}: cannot build search URL: {}", name, e);
                    return SourceOutcome::failed(e.to_string());
                }
            }
        } else {
            // Fixture replay with a blank query: the fixture key ignores the URL.
            driver.descriptor().base_url.to_string()
        };

        let fetch_request = FetchRequest {
            url,
            source: name.to_string(),
            media_type,
            page: request.page,
            timeout: self.inner.settings.fetch_timeout,
            headers: driver.request_headers().to_vec(),
        };

        let raw = match self.inner.fetcher.fetch(&fetch_request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("{}: fetch failed: {}", name, e);
                return SourceOutcome::failed(e.to_string());
            }
        };

        let context = ParseContext {
            media_type,
            source_name: name,
            query: &request.query,
            page: request.page,
        };
        let records = match catch_unwind(AssertUnwindSafe(|| driver.parse(&raw, &context))) {
            Ok(records) => records,
            Err(_) => {
                tracing::warn!("{}: parser panicked, discarding its results", name);
                return SourceOutcome::failed("parser panicked".to_string());
            }
        };

        let defaults = NormalizeDefaults {
            source: name,
            media_type,
            base_url: &driver.descriptor().base_url,
        };
        let results = normalize_all(records, &defaults);
        tracing::debug!("{}: {} results", name, results.len());
        SourceOutcome::ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::testing::{ScriptedFetcher, StaticDriver};
    use crate::types::MediaType;

    fn service_with(
        drivers: Vec<Arc<dyn SourceDriver>>,
        fetcher: Arc<ScriptedFetcher>,
        settings: SearchSettings,
    ) -> MediaSearchService {
        MediaSearchService::new(
            DriverRegistry::from_drivers(drivers).unwrap(),
            fetcher,
            Arc::new(SearchCache::new(Duration::from_secs(60))),
            settings,
        )
    }

    fn mock_settings() -> SearchSettings {
        SearchSettings {
            mode: FetchMode::Mock,
            fetch_timeout: Duration::from_secs(1),
            deadline: None,
            allow_empty_query_in_mock: false,
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_order_is_registration_order() {
        let fetcher = Arc::new(ScriptedFetcher::new().fail(
            "Gamma",
            FetchError::Status {
                url: "https://gamma.example.com".to_string(),
                status: 500,
            },
        ));
        let service = service_with(
            vec![
                StaticDriver::new("Alpha")
                    .with_generated(MediaType::Videos, 2)
                    .into_arc(),
                StaticDriver::new("Beta").into_arc(),
                StaticDriver::new("Gamma")
                    .with_generated(MediaType::Videos, 4)
                    .into_arc(),
                StaticDriver::new("Delta")
                    .with_generated(MediaType::Videos, 1)
                    .into_arc(),
            ],
            fetcher,
            mock_settings(),
        );

        let report = service
            .search_with_report(&SearchRequest::new("cats"))
            .await
            .unwrap();

        let sources: Vec<_> = report.results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["Alpha", "Alpha", "Delta"]);
        assert_eq!(report.sources.len(), 4);
        assert_eq!(report.sources[1].status, SourceStatus::Ok);
        assert!(matches!(report.sources[2].status, SourceStatus::Failed(_)));
        assert!(!report.cached);
    }

    #[tokio::test]
    async fn test_panicking_parser_is_contained() {
        let service = service_with(
            vec![
                StaticDriver::new("Stable")
                    .with_generated(MediaType::Videos, 1)
                    .into_arc(),
                StaticDriver::new("Broken").panicking_parse().into_arc(),
            ],
            Arc::new(ScriptedFetcher::new()),
            mock_settings(),
        );

        let report = service
            .search_with_report(&SearchRequest::new("cats"))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(
            report.sources[1].status,
            SourceStatus::Failed("parser panicked".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_query_rules() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let strict = service_with(
            vec![StaticDriver::new("Alpha").into_arc()],
            Arc::clone(&fetcher),
            mock_settings(),
        );
        assert!(matches!(
            strict.search(&SearchRequest::new("   ")).await,
            Err(MediaSearchError::EmptyQuery)
        ));
        assert_eq!(fetcher.calls(), 0);

        let replay = service_with(
            vec![
                StaticDriver::new("Alpha")
                    .with_generated(MediaType::Videos, 2)
                    .into_arc(),
            ],
            Arc::clone(&fetcher),
            SearchSettings {
                allow_empty_query_in_mock: true,
                ..mock_settings()
            },
        );
        let results = replay.search(&SearchRequest::new("")).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(fetcher.requests()[0].url, "https://static.example.com/");
    }

    #[tokio::test]
    async fn test_deadline_marks_slow_sources() {
        let fetcher = Arc::new(ScriptedFetcher::new().delay("Slow", Duration::from_secs(5)));
        let service = service_with(
            vec![
                StaticDriver::new("Slow")
                    .with_generated(MediaType::Videos, 3)
                    .into_arc(),
                StaticDriver::new("Fast")
                    .with_generated(MediaType::Videos, 1)
                    .into_arc(),
            ],
            fetcher,
            SearchSettings {
                deadline: Some(Duration::from_millis(100)),
                ..mock_settings()
            },
        );

        let report = service
            .search_with_report(&SearchRequest::new("cats"))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.sources[0].status, SourceStatus::TimedOut);
        assert_eq!(report.sources[1].status, SourceStatus::Ok);
    }

    #[tokio::test]
    async fn test_second_identical_search_is_served_from_cache() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let service = service_with(
            vec![
                StaticDriver::new("Alpha")
                    .with_generated(MediaType::Gifs, 2)
                    .into_arc(),
            ],
            Arc::clone(&fetcher),
            mock_settings(),
        );
        let request = SearchRequest::new("loop").with_media_type(MediaType::Gifs);

        let first = service.search_with_report(&request).await.unwrap();
        let second = service.search_with_report(&request).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert!(second.cached);
        assert_eq!(first.results, second.results);
    }

    #[test]
    fn test_report_serialization() {
        let report = SourceReport {
            name: "Alpha".to_string(),
            status: SourceStatus::Failed("HTTP 500".to_string()),
            count: 0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "HTTP 500");

        let ok = serde_json::to_value(SourceReport {
            status: SourceStatus::Ok,
            ..report
        })
        .unwrap();
        assert_eq!(ok["status"], "ok");
    }
}
