//! Mapping of search failures onto HTTP responses.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use trawl_search::MediaSearchError;

/// Errors returned by API handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Search service is still starting up")]
    NotReady,

    #[error("Invalid query string: {0}")]
    InvalidQuery(#[from] QueryRejection),

    #[error(transparent)]
    Search(#[from] MediaSearchError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::Search(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Search(MediaSearchError::RegistryUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("API request failed: {}", self);
        } else {
            tracing::debug!("Rejected API request: {}", self);
        }

        let body = json!({
            "message": self.to_string(),
            "data": [],
        });
        (status, Json(body)).into_response()
    }
}
