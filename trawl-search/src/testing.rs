//! Test doubles for drivers and fetch adapters.
//!
//! Available in this crate's unit tests and, through the `test-utils`
//! feature, to other crates' test suites.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use crate::drivers::{DriverDescriptor, SourceDriver};
use crate::errors::MediaSearchError;
use crate::fetch::{FetchAdapter, FetchError, FetchRequest};
use crate::registry::source_slug;
use crate::types::{MediaType, ParseContext, RawContent, RawRecord};

const STATIC_BASE_URL: &str = "https://static.example.com/";

/// In-memory driver returning canned records regardless of the body.
#[derive(Debug)]
pub struct StaticDriver {
    descriptor: DriverDescriptor,
    records: HashMap<MediaType, Vec<RawRecord>>,
    fail_url_build: bool,
    panic_on_parse: bool,
    url_builds: AtomicUsize,
    parses: AtomicUsize,
}

impl StaticDriver {
    /// Driver serving both media types with no records.
    ///
    /// # Panics
    /// Panics if `name` is blank.
    pub fn new(name: &str) -> Self {
        let descriptor =
            DriverDescriptor::new(name, STATIC_BASE_URL).expect("static driver name is valid");
        Self {
            descriptor,
            records: HashMap::new(),
            fail_url_build: false,
            panic_on_parse: false,
            url_builds: AtomicUsize::new(0),
            parses: AtomicUsize::new(0),
        }
    }

    pub fn with_media(mut self, supports_videos: bool, supports_gifs: bool) -> Self {
        self.descriptor = self.descriptor.with_media(supports_videos, supports_gifs);
        self
    }

    pub fn with_first_page(mut self, first_page: u32) -> Self {
        self.descriptor = self.descriptor.with_first_page(first_page);
        self
    }

    pub fn with_records(mut self, media_type: MediaType, records: Vec<RawRecord>) -> Self {
        self.records.insert(media_type, records);
        self
    }

    /// Adds `count` simple records for `media_type`, ids `1..=count`.
    pub fn with_generated(self, media_type: MediaType, count: usize) -> Self {
        let slug = source_slug(&self.descriptor.name);
        let records = (1..=count)
            .map(|n| {
                RawRecord::new(
                    n.to_string(),
                    format!("{slug} item {n}"),
                    format!("/{slug}/{n}"),
                )
            })
            .collect();
        self.with_records(media_type, records)
    }

    /// Makes every `build_search_url` call fail.
    pub fn failing_url_build(mut self) -> Self {
        self.fail_url_build = true;
        self
    }

    /// Makes every `parse` call panic.
    pub fn panicking_parse(mut self) -> Self {
        self.panic_on_parse = true;
        self
    }

    pub fn into_arc(self) -> Arc<dyn SourceDriver> {
        Arc::new(self)
    }

    pub fn url_build_count(&self) -> usize {
        self.url_builds.load(Ordering::SeqCst)
    }

    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    /// Base URL every static driver resolves relative links against.
    pub fn base_url() -> Url {
        Url::parse(STATIC_BASE_URL).expect("static base URL is valid")
    }
}

impl SourceDriver for StaticDriver {
    fn descriptor(&self) -> &DriverDescriptor {
        &self.descriptor
    }

    fn build_search_url(
        &self,
        query: &str,
        page: u32,
        media_type: MediaType,
    ) -> Result<String, MediaSearchError> {
        self.url_builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_url_build {
            return Err(MediaSearchError::InvalidDriver {
                name: self.descriptor.name.clone(),
                reason: "scripted URL build failure".to_string(),
            });
        }
        self.descriptor.check_search(query, media_type)?;

        Ok(format!(
            "{}{}/{}?q={}&page={}",
            STATIC_BASE_URL,
            source_slug(&self.descriptor.name),
            media_type,
            urlencoding::encode(query.trim()),
            self.descriptor.site_page(page)
        ))
    }

    fn parse(&self, _raw: &RawContent, context: &ParseContext<'_>) -> Vec<RawRecord> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_parse {
            panic!("scripted parser panic in {}", context.source_name);
        }
        self.records
            .get(&context.media_type)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct Script {
    outcome: Result<RawContent, FetchError>,
    delay: Option<Duration>,
    /// Failures served before `outcome`
    leading_failures: Vec<FetchError>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            outcome: Ok(RawContent::html("")),
            delay: None,
            leading_failures: Vec::new(),
        }
    }
}

/// Fetch adapter answering from per-source scripts and counting calls.
///
/// Sources without a script receive an empty HTML body.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Script>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, source: &str, update: impl FnOnce(&mut Script)) {
        let mut scripts = self.scripts.lock();
        update(scripts.entry(source_slug(source)).or_default());
    }

    /// Answers every request for `source` with `content`.
    pub fn respond(self, source: &str, content: RawContent) -> Self {
        self.script(source, |s| s.outcome = Ok(content));
        self
    }

    /// Fails every request for `source` with `error`.
    pub fn fail(self, source: &str, error: FetchError) -> Self {
        self.script(source, |s| s.outcome = Err(error));
        self
    }

    /// Fails the first `times` requests for `source`, then follows its script.
    pub fn fail_first(self, source: &str, times: usize, error: FetchError) -> Self {
        self.script(source, |s| s.leading_failures = vec![error; times]);
        self
    }

    /// Sleeps before answering requests for `source`.
    pub fn delay(self, source: &str, delay: Duration) -> Self {
        self.script(source, |s| s.delay = Some(delay));
        self
    }

    /// Total number of fetches performed.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of fetches for one source (name or alias).
    pub fn calls_for(&self, source: &str) -> usize {
        let slug = source_slug(source);
        self.requests
            .lock()
            .iter()
            .filter(|r| source_slug(&r.source) == slug)
            .count()
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl FetchAdapter for ScriptedFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawContent, FetchError> {
        self.requests.lock().push(request.clone());

        let (delay, outcome) = {
            let mut scripts = self.scripts.lock();
            let script = scripts.entry(source_slug(&request.source)).or_default();
            let outcome = if script.leading_failures.is_empty() {
                script.outcome.clone()
            } else {
                Err(script.leading_failures.remove(0))
            };
            (script.delay, outcome)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }
}

/// Plain 503 error for scripting transient failures.
pub fn unavailable(url: &str) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status: 503,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: &str) -> FetchRequest {
        FetchRequest {
            url: "https://static.example.com/x".to_string(),
            source: source.to_string(),
            media_type: MediaType::Videos,
            page: 1,
            timeout: Duration::from_secs(1),
            headers: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_scripted_fetcher_follows_script() {
        let fetcher = ScriptedFetcher::new()
            .respond("sex.com", RawContent::json("[]"))
            .fail_first("Beta", 1, unavailable("https://beta.example.com"));

        assert_eq!(
            fetcher.fetch(&request("sexcom")).await.unwrap().kind,
            crate::types::ContentKind::Json
        );
        assert!(fetcher.fetch(&request("Beta")).await.is_err());
        assert!(fetcher.fetch(&request("Beta")).await.is_ok());

        assert_eq!(fetcher.calls(), 3);
        assert_eq!(fetcher.calls_for("beta"), 2);
    }

    #[test]
    fn test_static_driver_counts_and_gates() {
        let driver = StaticDriver::new("Alpha")
            .with_media(true, false)
            .with_generated(MediaType::Videos, 2);

        assert!(driver.build_search_url("x", 1, MediaType::Gifs).is_err());
        assert_eq!(
            driver.build_search_url("a b", 2, MediaType::Videos).unwrap(),
            "https://static.example.com/alpha/videos?q=a%20b&page=2"
        );
        assert_eq!(driver.url_build_count(), 2);
    }
}
