//! Trawl Web - JSON API Server

#![warn(clippy::missing_errors_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Exposes the aggregated media search over HTTP: search, driver listing and
//! health endpoints.

pub mod handlers;
pub mod server;

// Re-export main types
pub use server::{AppState, Readiness, router, run_server};
