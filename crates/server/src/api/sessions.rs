//! Session creation.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use kaistream_core::SessionConfig;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub id: String,
    /// Normalized service name (`none` when unrecognized).
    pub service: String,
    pub expires_at: DateTime<Utc>,
}

/// Store the client's settings and hand back the id its addon URLs carry.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(config): Json<SessionConfig>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let session = state.sessions().create(config).await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id: session.id,
            service: session.config.service,
            expires_at: session.expires_at,
        }),
    )
}
