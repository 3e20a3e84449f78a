//! Integration tests for Trawl
//!
//! Exercise the search service, the fixture-backed drivers and the HTTP API
//! together, with scripted fetchers standing in for the network.

#[path = "style.rs"]
mod style;

#[path = "integration/support.rs"]
mod support;

#[path = "integration/aggregation.rs"]
mod aggregation;
#[path = "integration/api.rs"]
mod api;
#[path = "integration/caching.rs"]
mod caching;
#[path = "integration/fixtures.rs"]
mod fixtures;
#[path = "integration/retry.rs"]
mod retry;
