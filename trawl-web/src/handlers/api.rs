//! JSON API handlers for search, driver listing and health

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use trawl_search::{
    MediaResult, MediaSearchError, MediaSearchService, SearchParams, SearchRequest,
};

use super::errors::ApiError;
use crate::server::{AppState, Readiness};

/// Envelope shared by every successful API answer.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            message: message.into(),
            data,
        })
    }
}

/// Service answering requests, or why there is none.
fn ready_service(state: &AppState) -> Result<&MediaSearchService, ApiError> {
    match state.readiness() {
        Readiness::Ready(service) => Ok(service),
        Readiness::Starting => Err(ApiError::NotReady),
        Readiness::Failed(reason) => Err(MediaSearchError::RegistryUnavailable {
            reason: reason.to_string(),
        }
        .into()),
    }
}

/// `GET /api/search?query=&source=&type=&page=`
///
/// An empty result list is still a success; a blank or malformed query
/// string is a 400 and a missing search service a 503.
pub async fn api_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<MediaResult>>>, ApiError> {
    let service = ready_service(&state)?;
    let Query(params) = params?;
    let request = SearchRequest::from_params(&params);

    let results = service.search(&request).await?;
    let message = format!(
        "Found {} {} for '{}' (page {}, source {}) [{}]",
        results.len(),
        request.media_type,
        request.query.trim(),
        request.page,
        request.source_label(),
        service.mode()
    );
    Ok(ApiResponse::new(message, results))
}

/// `GET /api/drivers` lists registered sources in fan-out order.
pub async fn api_drivers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let service = ready_service(&state)?;
    let names = service.driver_names();
    Ok(ApiResponse::new(
        format!("{} drivers registered", names.len()),
        names,
    ))
}

/// `GET /api/health` reports readiness; 503 until the catalogue is loaded
/// and for good when loading failed.
pub async fn api_health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime_secs = state.server_started_at.elapsed().as_secs();

    match state.readiness() {
        Readiness::Ready(service) => {
            let stats = service.cache().statistics();
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ready",
                    "mode": service.mode().to_string(),
                    "sources": service.registry().len(),
                    "uptime_secs": uptime_secs,
                    "cache": {
                        "entries": stats.entries,
                        "hit_rate": stats.hit_rate,
                    },
                })),
            )
        }
        Readiness::Starting => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "mode": state.mode.to_string(),
                "uptime_secs": uptime_secs,
            })),
        ),
        Readiness::Failed(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "failed",
                "reason": reason,
                "mode": state.mode.to_string(),
                "uptime_secs": uptime_secs,
            })),
        ),
    }
}
