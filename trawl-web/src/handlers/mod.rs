//! HTTP request handlers

pub mod api;
pub mod errors;

// Re-export handler functions
pub use api::{ApiResponse, api_drivers, api_health, api_search};
pub use errors::ApiError;
