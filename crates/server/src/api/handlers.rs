use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use kaistream_core::{EpisodeTarget, SanitizedConfig, SessionError};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body shared by the API handlers.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(error)))
}

impl From<SessionError> for ErrorResponse {
    fn from(e: SessionError) -> Self {
        Self::new(e.to_string())
    }
}

/// Missing and expired sessions both answer 404.
pub fn session_error(e: SessionError) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::from(e)))
}

/// Episode target from request parameters; episode numbers start at 1.
pub fn episode_target(number: u32, title: Option<String>) -> Result<EpisodeTarget, ApiError> {
    EpisodeTarget::from_parts(number, title).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            "episode must be a positive integer",
        )
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
