//! Trawl Core - configuration, fetch mode and tracing
//!
//! Shared building blocks used by the search pipeline, the API server and the
//! command-line interface.

pub mod config;
pub mod mode;
pub mod tracing_setup;

pub use config::{CacheConfig, FetchConfig, RetryConfig, SearchConfig, ServerConfig, TrawlConfig};
pub use mode::FetchMode;

/// Process-level errors that abort startup or a command.
#[derive(Debug, thiserror::Error)]
pub enum TrawlError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search setup error: {reason}")]
    Search { reason: String },
}

impl TrawlError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            TrawlError::Configuration { reason } => format!("Configuration problem: {reason}"),
            TrawlError::Io(_) => "File system error occurred".to_string(),
            TrawlError::Search { reason } => format!("Search setup failed: {reason}"),
        }
    }

    /// Wraps any displayable search-side failure.
    pub fn from_search_error(error: impl std::fmt::Display) -> Self {
        TrawlError::Search {
            reason: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrawlError>;
