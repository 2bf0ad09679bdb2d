//! Playback endpoint: redirects players to a resolved stream or to the intro
//! video while the provider is still working.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use kaistream_core::{EpisodeTarget, SessionConfig};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::handlers::{api_error, episode_target, session_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackAction {
    Play,
    Download,
}

impl PlaybackAction {
    fn as_str(&self) -> &'static str {
        match self {
            PlaybackAction::Play => "play",
            PlaybackAction::Download => "download",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaybackQuery {
    pub action: PlaybackAction,
    pub magnet: String,
    pub episode: u32,
    #[serde(default, alias = "episodeName")]
    pub episode_name: Option<String>,
}

impl PlaybackQuery {
    fn target(&self) -> Result<EpisodeTarget, ApiError> {
        episode_target(self.episode, self.episode_name.clone())
    }
}

fn found(url: &str) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            warn!(url = %url, "Refusing to redirect to an invalid URL");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

fn require_provider(session: &SessionConfig) -> Result<(), ApiError> {
    if session.has_provider() {
        Ok(())
    } else {
        Err(api_error(
            StatusCode::BAD_REQUEST,
            "Debrid service not configured for playback",
        ))
    }
}

/// `GET /c/{id}/playback`
pub async fn playback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PlaybackQuery>,
) -> Result<Response, ApiError> {
    let session = state.sessions().get(&id).await.map_err(session_error)?;
    let target = query.target()?;
    info!(
        session = %id,
        action = query.action.as_str(),
        episode = target.number,
        "Playback requested"
    );

    match query.action {
        PlaybackAction::Download => {
            if session.config.has_provider() {
                state.resolver().spawn_initiate_download(
                    query.magnet,
                    session.config.provider(),
                    target,
                );
            } else {
                warn!(session = %id, "Download requested without a debrid service");
            }
            Ok(found(state.intro_video_url()))
        }
        PlaybackAction::Play => {
            require_provider(&session.config)?;
            let provider = session.config.provider();
            match state
                .resolver()
                .resolve_stream(&query.magnet, &provider, &target)
                .await
            {
                Some(stream) => {
                    info!(session = %id, file = %stream.filename, "Redirecting to stream");
                    Ok(found(&stream.url))
                }
                None => {
                    info!(session = %id, "Stream not ready, starting download");
                    state
                        .resolver()
                        .spawn_initiate_download(query.magnet, provider, target);
                    Ok(found(state.intro_video_url()))
                }
            }
        }
    }
}

/// `HEAD /c/{id}/playback`
///
/// Players probe the URL before following it. Answers with video headers
/// without contacting the provider.
pub async fn playback_head(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PlaybackQuery>,
) -> Result<Response, ApiError> {
    let session = state.sessions().get(&id).await.map_err(session_error)?;
    query.target()?;
    if query.action == PlaybackAction::Play {
        require_provider(&session.config)?;
    }
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "video/mp4"),
            (header::ACCEPT_RANGES, "bytes"),
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, max-age=0",
            ),
        ],
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_target_ignores_blank_title() {
        let query = PlaybackQuery {
            action: PlaybackAction::Play,
            magnet: "magnet:?xt=urn:btih:abc".to_string(),
            episode: 4,
            episode_name: Some("  ".to_string()),
        };
        let target = query.target().unwrap();
        assert_eq!(target.number, 4);
        assert!(target.title().is_none());
    }

    #[test]
    fn test_query_target_rejects_episode_zero() {
        let query = PlaybackQuery {
            action: PlaybackAction::Play,
            magnet: "magnet:?xt=urn:btih:abc".to_string(),
            episode: 0,
            episode_name: None,
        };
        let (status, _) = query.target().unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_found_sets_location() {
        let response = found("https://cdn.example/video.mp4");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://cdn.example/video.mp4"
        );
    }
}
