use std::sync::Arc;

use kaistream_core::{Config, Resolver, SanitizedConfig, SessionStore, TorrentFinder};

/// Shared application state
pub struct AppState {
    config: Config,
    sessions: SessionStore,
    resolver: Arc<Resolver>,
    finder: TorrentFinder,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: SessionStore,
        resolver: Arc<Resolver>,
        finder: TorrentFinder,
    ) -> Self {
        Self {
            config,
            sessions,
            resolver,
            finder,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn finder(&self) -> &TorrentFinder {
        &self.finder
    }

    /// Placeholder video served while a download is still in progress.
    pub fn intro_video_url(&self) -> &str {
        &self.config.resolver.intro_video_url
    }
}
