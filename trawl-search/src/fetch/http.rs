//! Live HTTP retrieval.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use trawl_core::FetchConfig;

use super::{FetchAdapter, FetchError, FetchRequest};
use crate::errors::MediaSearchError;
use crate::types::{ContentKind, RawContent};

/// Fetch adapter performing real GET requests with reqwest.
///
/// Retries are not handled here; wrap in
/// [`RetryingFetcher`](super::RetryingFetcher) for backoff.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher sending the configured user agent.
    ///
    /// # Errors
    /// - `MediaSearchError::Configuration` - The HTTP client cannot be built
    pub fn new(config: &FetchConfig) -> Result<Self, MediaSearchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| MediaSearchError::Configuration {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FetchAdapter for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawContent, FetchError> {
        let mut builder = self.client.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!("GET {} ({})", request.url, request.source);

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: request.url.clone(),
                    timeout: request.timeout,
                }
            } else if e.is_builder() {
                FetchError::InvalidRequest {
                    reason: format!("{}: {e}", request.url),
                }
            } else {
                FetchError::Connection {
                    url: request.url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(ContentKind::from_content_type);

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: request.url.clone(),
                    timeout: request.timeout,
                }
            } else {
                FetchError::Body {
                    url: request.url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let kind = declared.unwrap_or_else(|| ContentKind::sniff(&body));
        Ok(RawContent { body, kind })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::MediaType;

    #[tokio::test]
    async fn test_unreachable_host_is_a_fetch_error() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let request = FetchRequest {
            // Port 9 on loopback is reserved for discard and normally closed.
            url: "http://127.0.0.1:9/search?q=x".to_string(),
            source: "Local".to_string(),
            media_type: MediaType::Videos,
            page: 1,
            timeout: Duration::from_secs(2),
            headers: vec![("Referer".to_string(), "http://127.0.0.1/".to_string())],
        };

        let error = fetcher.fetch(&request).await.unwrap_err();
        assert!(matches!(
            error,
            FetchError::Connection { .. } | FetchError::Timeout { .. }
        ));
    }
}
