//! Types for torrent index search and relevance filtering.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::magnet;
use crate::matching::CandidateFile;

/// One search-result entry from a torrent index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentCandidate {
    /// Release title as listed by the index.
    pub title: String,
    /// Magnet URI used to submit the torrent to a provider.
    pub magnet_link: String,
    /// Human-readable size as listed (e.g. "1.2 GiB").
    #[serde(default)]
    pub size_text: String,
    #[serde(default)]
    pub seeders: u32,
    #[serde(default)]
    pub leechers: u32,
    /// Completed downloads reported by the index.
    #[serde(default)]
    pub downloads: u32,
    /// Publication date text as listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// Info hash (lowercase), absent when the magnet is malformed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    /// Torrent page on the index (holds the file list).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details_url: Option<String>,
    /// .torrent download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_url: Option<String>,
    /// Files inside the torrent. Empty until fetched.
    #[serde(default)]
    pub file_manifest: Vec<CandidateFile>,
    /// File that qualified this torrent for the requested episode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_file: Option<CandidateFile>,
    /// More than one file in the manifest.
    #[serde(default)]
    pub is_pack: bool,
}

impl TorrentCandidate {
    /// Create a candidate; the info hash is derived from the magnet link.
    pub fn new(title: impl Into<String>, magnet_link: impl Into<String>) -> Self {
        let magnet_link = magnet_link.into();
        Self {
            title: title.into(),
            info_hash: magnet::info_hash(&magnet_link),
            magnet_link,
            size_text: String::new(),
            seeders: 0,
            leechers: 0,
            downloads: 0,
            published: None,
            details_url: None,
            torrent_url: None,
            file_manifest: Vec::new(),
            matched_file: None,
            is_pack: false,
        }
    }

    pub fn health(&self) -> TorrentHealth {
        TorrentHealth::from_seeders(self.seeders)
    }
}

/// Coarse swarm health derived from the seeder count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentHealth {
    Dead,
    Poor,
    Average,
    Good,
    Excellent,
}

impl TorrentHealth {
    pub fn from_seeders(seeders: u32) -> Self {
        match seeders {
            0 => TorrentHealth::Dead,
            1..=4 => TorrentHealth::Poor,
            5..=9 => TorrentHealth::Average,
            10..=29 => TorrentHealth::Good,
            _ => TorrentHealth::Excellent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentHealth::Dead => "dead",
            TorrentHealth::Poor => "poor",
            TorrentHealth::Average => "average",
            TorrentHealth::Good => "good",
            TorrentHealth::Excellent => "excellent",
        }
    }
}

/// Errors that can occur while talking to a torrent index.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Torrent index connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Torrent index API error: {0}")]
    ApiError(String),

    #[error("Unexpected page shape: {0}")]
    Parse(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_connect() {
            SearchError::ConnectionFailed(e.to_string())
        } else {
            SearchError::ApiError(e.to_string())
        }
    }
}

/// A torrent index that can be searched by free text.
#[async_trait]
pub trait TorrentIndex: Send + Sync {
    /// Index name for logging.
    fn name(&self) -> &str;

    /// Search listings. Manifests are not populated.
    async fn search(&self, query: &str) -> Result<Vec<TorrentCandidate>, SearchError>;
}

/// Fetches the file list of a single listing.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    async fn fetch_manifest(
        &self,
        candidate: &TorrentCandidate,
    ) -> Result<Vec<CandidateFile>, SearchError>;
}
