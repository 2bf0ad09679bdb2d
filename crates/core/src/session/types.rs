//! Session data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::debrid::{ProviderConfig, ProviderKind};

/// Errors from the session store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session expired: {0}")]
    Expired(String),
}

/// Which streams a client wants offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadOption {
    #[default]
    All,
    Cached,
    Download,
}

/// Settings submitted by a client when it configures the addon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// `realdebrid`, `alldebrid`, `torbox` or `none`.
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default, alias = "apiKey")]
    pub api_key: String,
    /// Carried for the addon stream listing, which is not served here.
    #[serde(default, alias = "downloadOption")]
    pub download_option: DownloadOption,
    /// Also submit the next episode when one is played. Carried for the
    /// addon stream listing, which is not served here.
    #[serde(default, alias = "prepareNextEpisode")]
    pub prepare_next_episode: bool,
}

fn default_service() -> String {
    "none".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service: default_service(),
            api_key: String::new(),
            download_option: DownloadOption::All,
            prepare_next_episode: false,
        }
    }
}

impl SessionConfig {
    /// Normalize the service name; anything unrecognized becomes `none`.
    pub fn sanitized(mut self) -> Self {
        self.service = ProviderKind::parse(&self.service)
            .map(|k| k.as_str().to_string())
            .unwrap_or_else(default_service);
        self.api_key = self.api_key.trim().to_string();
        self
    }

    pub fn provider(&self) -> ProviderConfig {
        ProviderConfig::new(self.service.clone(), self.api_key.clone())
    }

    /// Whether a debrid provider is usable for this session.
    pub fn has_provider(&self) -> bool {
        self.provider().is_configured()
    }
}

/// A stored session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_accepts_camel_case_fields() {
        let config: SessionConfig = serde_json::from_value(serde_json::json!({
            "service": "alldebrid",
            "apiKey": "k",
            "downloadOption": "cached",
            "prepareNextEpisode": true
        }))
        .unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.download_option, DownloadOption::Cached);
        assert!(config.prepare_next_episode);
    }

    #[test]
    fn test_config_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert!(!config.has_provider());
    }

    #[test]
    fn test_unknown_service_sanitizes_to_none() {
        let config = SessionConfig {
            service: "premiumize".to_string(),
            api_key: "k".to_string(),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.service, "none");
        assert!(!config.has_provider());

        let config = SessionConfig {
            service: "Real-Debrid".to_string(),
            api_key: " k ".to_string(),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(config.service, "realdebrid");
        assert_eq!(config.api_key, "k");
        assert!(config.has_provider());
    }
}
