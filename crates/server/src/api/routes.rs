use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, playback, sessions, torrents};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Admin API
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .with_state(state.clone());

    // Addon routes, scoped by session id
    let addon_routes = Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/c/{id}/playback",
            get(playback::playback).head(playback::playback_head),
        )
        .route("/c/{id}/torrents", get(torrents::find_torrents))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(addon_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(metrics_middleware)),
        )
}
