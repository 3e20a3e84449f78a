//! Error types for media search functionality.

use thiserror::Error;

/// Errors that can occur while configuring or running an aggregated search.
///
/// Per-source failures never reach the caller of
/// [`MediaSearchService::search`](crate::MediaSearchService::search); they are
/// recorded in the per-source report instead. Only validation and setup
/// problems surface as `Err`.
#[derive(Debug, Error)]
pub enum MediaSearchError {
    /// The search query was missing or blank.
    #[error("Search query must not be empty")]
    EmptyQuery,

    /// Unsupported or invalid media type specified.
    #[error("Invalid media type: {media_type}")]
    InvalidMediaType {
        /// The invalid media type that was specified
        media_type: String,
    },

    /// A driver was asked for a media type it does not declare.
    #[error("Source '{source_name}' does not support {media_type}")]
    UnsupportedMediaType {
        /// Display name of the driver
        source_name: String,
        /// The requested media type
        media_type: String,
    },

    /// A driver is misconfigured (bad base URL, selector or template).
    #[error("Invalid driver '{name}': {reason}")]
    InvalidDriver {
        /// Driver name as written in the catalogue
        name: String,
        /// What was wrong with it
        reason: String,
    },

    /// Two drivers resolve to the same registry key.
    #[error("Driver name '{name}' is already registered")]
    DuplicateDriver {
        /// The conflicting name or alias
        name: String,
    },

    /// The driver catalogue could not be read or decoded.
    #[error("Driver catalogue error: {reason}")]
    CatalogError {
        /// The reason for the failure
        reason: String,
    },

    /// The search service is not ready to answer queries.
    #[error("Search registry unavailable: {reason}")]
    RegistryUnavailable {
        /// The reason the registry is missing
        reason: String,
    },

    /// Failed to construct a component from configuration.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// The reason for the failure
        reason: String,
    },
}

impl MediaSearchError {
    /// Whether the error was caused by caller input rather than server state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuery | Self::InvalidMediaType { .. } | Self::UnsupportedMediaType { .. }
        )
    }
}
