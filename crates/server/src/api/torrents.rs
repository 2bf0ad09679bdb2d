//! Torrent discovery for an anime episode.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use kaistream_core::TorrentCandidate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::handlers::{episode_target, session_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TorrentsQuery {
    pub anime: String,
    pub episode: u32,
    #[serde(default, alias = "episodeName")]
    pub episode_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TorrentsResponse {
    pub torrents: Vec<TorrentCandidate>,
    pub count: usize,
}

/// `GET /c/{id}/torrents`
///
/// Torrents from the index that contain the episode, best seeded first.
/// Search failures yield an empty list.
pub async fn find_torrents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TorrentsQuery>,
) -> Result<Json<TorrentsResponse>, ApiError> {
    state.sessions().get(&id).await.map_err(session_error)?;

    let target = episode_target(query.episode, query.episode_name)?;
    let torrents = state
        .finder()
        .find_relevant_torrents(&query.anime, &target)
        .await;

    Ok(Json(TorrentsResponse {
        count: torrents.len(),
        torrents,
    }))
}
