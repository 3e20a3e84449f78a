//! Fetch adapters: how raw search pages are retrieved.
//!
//! The aggregator only sees the [`FetchAdapter`] trait. Live mode plugs in
//! [`HttpFetcher`] wrapped in [`RetryingFetcher`]; mock mode plugs in
//! [`FixtureFetcher`]. Drivers and fan-out logic are identical in both.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{MediaType, RawContent};

pub mod fixture;
pub mod http;
pub mod retry;

pub use fixture::FixtureFetcher;
pub use http::HttpFetcher;
pub use retry::{RetryPolicy, RetryingFetcher};

/// Everything an adapter needs to retrieve one search page.
///
/// `source`, `media_type` and `page` identify the request for fixture lookup;
/// live adapters only use `url`, `timeout` and `headers`.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub source: String,
    pub media_type: MediaType,
    /// 1-based API page (not the site's page index)
    pub page: u32,
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
}

/// Trait for page retrieval backends.
#[async_trait]
pub trait FetchAdapter: Send + Sync + std::fmt::Debug {
    /// Retrieve the body for `request`.
    ///
    /// # Errors
    /// - `FetchError::Status` - Non-2xx response
    /// - `FetchError::Timeout` - No response within `request.timeout`
    /// - `FetchError::Connection` - Transport failure
    /// - `FetchError::FixtureMissing` - Mock mode has no recording for the key
    async fn fetch(&self, request: &FetchRequest) -> Result<RawContent, FetchError>;
}

/// Errors produced while retrieving a page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    #[error("Failed to read body from {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("No fixture for {source_name} ({media_type}, page {page}) under {}", dir.display())]
    FixtureMissing {
        source_name: String,
        media_type: MediaType,
        page: u32,
        dir: PathBuf,
    },

    #[error("Failed to read fixture {}: {reason}", path.display())]
    FixtureIo { path: PathBuf, reason: String },
}

impl FetchError {
    /// Whether another attempt may succeed.
    ///
    /// Server errors, rate limiting, timeouts and dropped connections are
    /// transient. Other 4xx responses and fixture problems are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Timeout { .. } | Self::Connection { .. } => true,
            Self::Body { .. }
            | Self::InvalidRequest { .. }
            | Self::FixtureMissing { .. }
            | Self::FixtureIo { .. } => false,
        }
    }

    /// HTTP status code, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.com".to_string(),
            status: code,
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(403).is_retryable());
        assert!(
            FetchError::Connection {
                url: "https://example.com".to_string(),
                reason: "reset".to_string()
            }
            .is_retryable()
        );
        assert!(
            FetchError::Timeout {
                url: "https://example.com".to_string(),
                timeout: Duration::from_secs(1)
            }
            .is_retryable()
        );
        assert!(
            !FetchError::FixtureMissing {
                source_name: "Example".to_string(),
                media_type: MediaType::Videos,
                page: 1,
                dir: PathBuf::from("fixtures"),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(status(502).status(), Some(502));
        assert_eq!(
            FetchError::InvalidRequest {
                reason: "bad".to_string()
            }
            .status(),
            None
        );
    }
}
