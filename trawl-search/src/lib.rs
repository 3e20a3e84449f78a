//! Trawl Search - multi-source media search aggregation

#![deny(clippy::missing_errors_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Queries every registered content source for videos or GIFs, normalizes
//! the heterogeneous HTML and JSON answers into [`MediaResult`]s, and caches
//! the aggregated result per query.

pub mod cache;
pub mod drivers;
pub mod errors;
pub mod fetch;
pub mod normalize;
pub mod registry;
pub mod request;
pub mod service;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export main types
pub use cache::{CacheKey, CacheStatistics, SearchCache};
pub use drivers::{
    DriverDescriptor, DriverSpec, HtmlDriver, HtmlSelectors, JsonDriver, JsonFields,
    SearchUrlTemplate, SearchUrls, SourceDriver, load_catalog, parse_catalog,
};
pub use errors::MediaSearchError;
pub use fetch::{
    FetchAdapter, FetchError, FetchRequest, FixtureFetcher, HttpFetcher, RetryPolicy,
    RetryingFetcher,
};
pub use registry::{DriverRegistry, source_slug};
pub use request::{SearchParams, SearchRequest};
pub use service::{MediaSearchService, SearchReport, SearchSettings, SourceReport, SourceStatus};
pub use types::{ContentKind, MediaResult, MediaType, ParseContext, RawContent, RawRecord};

/// Convenience type alias for Results with MediaSearchError.
pub type Result<T> = std::result::Result<T, MediaSearchError>;
