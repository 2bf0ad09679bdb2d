//! Debrid provider types.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching::{basename, CandidateFile, FileRecord};

/// Errors from debrid provider adapters.
#[derive(Debug, Clone, Error)]
pub enum DebridError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid credentials for {0}")]
    InvalidCredentials(String),

    #[error("Magnet link has no info hash: {0}")]
    InvalidMagnet(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl DebridError {
    /// Configuration errors fail fast and are never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DebridError::NotConfigured(_) | DebridError::InvalidCredentials(_)
        )
    }
}

impl From<reqwest::Error> for DebridError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DebridError::Timeout
        } else if e.is_decode() {
            DebridError::Parse(e.to_string())
        } else {
            DebridError::Api(e.to_string())
        }
    }
}

/// Supported debrid services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    RealDebrid,
    AllDebrid,
    Torbox,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::RealDebrid => "realdebrid",
            ProviderKind::AllDebrid => "alldebrid",
            ProviderKind::Torbox => "torbox",
        }
    }

    /// Parse a user-supplied service name. `none` and unknown names yield `None`.
    pub fn parse(service: &str) -> Option<Self> {
        service.parse().ok()
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DebridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "realdebrid" => Ok(ProviderKind::RealDebrid),
            "alldebrid" => Ok(ProviderKind::AllDebrid),
            "torbox" => Ok(ProviderKind::Torbox),
            _ => Err(DebridError::NotConfigured(s.to_string())),
        }
    }
}

/// Provider choice and credentials, as stored in a client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub service: String,
    pub api_key: String,
}

impl ProviderConfig {
    pub fn new(service: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            api_key: api_key.into(),
        }
    }

    /// Resolve the configured service, failing when none is usable.
    pub fn kind(&self) -> Result<ProviderKind, DebridError> {
        let kind: ProviderKind = self.service.parse()?;
        if self.api_key.trim().is_empty() {
            return Err(DebridError::NotConfigured(format!(
                "{} has no API key",
                kind
            )));
        }
        Ok(kind)
    }

    pub fn is_configured(&self) -> bool {
        self.kind().is_ok()
    }
}

/// Mapped outcome of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Downloading,
    Completed,
    Error,
    NotFound,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Downloading => "downloading",
            ResolutionStatus::Completed => "completed",
            ResolutionStatus::Error => "error",
            ResolutionStatus::NotFound => "not_found",
        }
    }
}

/// A playable link for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLink {
    pub url: String,
    pub filename: String,
}

/// Status plus links. Links are only ever present for a completed resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    status: ResolutionStatus,
    links: Vec<StreamLink>,
}

impl ResolutionResult {
    pub fn completed(links: Vec<StreamLink>) -> Self {
        Self {
            status: ResolutionStatus::Completed,
            links,
        }
    }

    /// A non-completed outcome. Passing `Completed` here yields an error result.
    pub fn pending(status: ResolutionStatus) -> Self {
        let status = if status == ResolutionStatus::Completed {
            ResolutionStatus::Error
        } else {
            status
        };
        Self {
            status,
            links: Vec::new(),
        }
    }

    pub fn downloading() -> Self {
        Self::pending(ResolutionStatus::Downloading)
    }

    pub fn error() -> Self {
        Self::pending(ResolutionStatus::Error)
    }

    pub fn not_found() -> Self {
        Self::pending(ResolutionStatus::NotFound)
    }

    pub fn status(&self) -> ResolutionStatus {
        self.status
    }

    pub fn links(&self) -> &[StreamLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<StreamLink> {
        self.links
    }
}

/// One file in a provider's manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub file: CandidateFile,
    /// Whether the provider will produce a link for this file.
    pub selected: bool,
    /// Link already attached to this file by the provider, if any.
    pub link: Option<String>,
}

impl ManifestEntry {
    pub fn new(file: CandidateFile) -> Self {
        Self {
            file,
            selected: true,
            link: None,
        }
    }

    pub fn unselected(mut self) -> Self {
        self.selected = false;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

impl FileRecord for ManifestEntry {
    fn to_candidate(&self) -> CandidateFile {
        self.file.clone()
    }
}

/// Raw provider view of one item, before status mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSnapshot {
    pub item_id: String,
    /// Provider's own status word.
    pub status: String,
    pub manifest: Vec<ManifestEntry>,
    /// Links not yet attached to a file, in provider order.
    pub links: Vec<String>,
}

impl ProviderSnapshot {
    pub fn new(item_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            status: status.into(),
            ..Default::default()
        }
    }

    pub fn has_unselected_files(&self) -> bool {
        self.manifest.iter().any(|e| !e.selected)
    }

    /// Find the link for the manifest entry at `index`.
    ///
    /// Attached links win. Otherwise the loose link list is searched for one
    /// naming the file, and failing that the link at the file's position
    /// among the selected entries is used.
    pub fn paired_link(&self, index: usize) -> Option<String> {
        let entry = self.manifest.get(index)?;
        if let Some(link) = &entry.link {
            return Some(link.clone());
        }
        if !entry.selected || self.links.is_empty() {
            return None;
        }

        let wanted = basename(&entry.file.name).to_lowercase();
        if !wanted.is_empty() {
            let by_name = self.links.iter().find(|link| {
                let tail = link.rsplit('/').next().unwrap_or_default();
                let tail = urlencoding::decode(tail)
                    .map(|s| s.to_lowercase())
                    .unwrap_or_else(|_| tail.to_lowercase());
                tail.contains(&wanted)
            });
            if let Some(link) = by_name {
                return Some(link.clone());
            }
        }

        let position = self.manifest[..index].iter().filter(|e| e.selected).count();
        self.links.get(position).cloned()
    }
}

/// File selection request sent to providers that need one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChoice {
    One(String),
    All,
}

impl FileChoice {
    pub fn as_param(&self) -> &str {
        match self {
            FileChoice::One(id) => id,
            FileChoice::All => "all",
        }
    }
}

/// Adapter for one debrid service.
///
/// Adapters only speak the provider's wire protocol; status mapping, file
/// selection and link pairing are driven by the resolver.
#[async_trait]
pub trait DebridProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Check the API key against the provider.
    async fn check_credentials(&self) -> bool;

    /// Submit a magnet without waiting. Returns the provider item id,
    /// including when the provider already knew the magnet.
    async fn submit_and_forget(&self, magnet: &str) -> Option<String>;

    /// Locate the item for this magnet and report its raw state.
    /// Returns `DebridError::NotFound` when the provider has no such item.
    async fn get_status_and_files(&self, magnet: &str) -> Result<ProviderSnapshot, DebridError>;

    /// Map the provider's status word. Unknown words map to `Error`.
    fn map_status(&self, snapshot: &ProviderSnapshot) -> ResolutionStatus;

    /// Whether an explicit file selection is needed before links appear.
    fn needs_file_selection(&self, _snapshot: &ProviderSnapshot) -> bool {
        false
    }

    /// Select files on the provider side.
    async fn select_files(&self, _item_id: &str, _choice: &FileChoice) -> Result<(), DebridError> {
        Ok(())
    }

    /// Produce the provider link for the manifest entry at `index`.
    async fn link_for(
        &self,
        snapshot: &ProviderSnapshot,
        index: usize,
    ) -> Result<Option<String>, DebridError> {
        Ok(snapshot.paired_link(index))
    }

    /// Turn a provider link into a directly fetchable URL.
    async fn de_restrict_link(&self, url: &str) -> Result<String, DebridError> {
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!(ProviderKind::parse("realdebrid"), Some(ProviderKind::RealDebrid));
        assert_eq!(ProviderKind::parse("Real-Debrid"), Some(ProviderKind::RealDebrid));
        assert_eq!(ProviderKind::parse("ALLDEBRID"), Some(ProviderKind::AllDebrid));
        assert_eq!(ProviderKind::parse("torbox"), Some(ProviderKind::Torbox));
        assert_eq!(ProviderKind::parse("none"), None);
        assert_eq!(ProviderKind::parse("premiumize"), None);
    }

    #[test]
    fn test_provider_config_requires_key() {
        assert!(ProviderConfig::new("realdebrid", "key").is_configured());
        assert!(!ProviderConfig::new("realdebrid", "  ").is_configured());
        let err = ProviderConfig::new("none", "key").kind().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_resolution_result_never_carries_links_unless_completed() {
        let result = ResolutionResult::pending(ResolutionStatus::Completed);
        assert_eq!(result.status(), ResolutionStatus::Error);
        assert!(result.links().is_empty());

        assert!(ResolutionResult::downloading().links().is_empty());
        assert!(ResolutionResult::not_found().links().is_empty());

        let done = ResolutionResult::completed(vec![StreamLink {
            url: "https://cdn/x.mkv".to_string(),
            filename: "x.mkv".to_string(),
        }]);
        assert_eq!(done.status(), ResolutionStatus::Completed);
        assert_eq!(done.links().len(), 1);
    }

    fn snapshot(entries: Vec<ManifestEntry>, links: &[&str]) -> ProviderSnapshot {
        ProviderSnapshot {
            item_id: "ID".to_string(),
            status: "downloaded".to_string(),
            manifest: entries,
            links: links.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_paired_link_prefers_attached_link() {
        let snap = snapshot(
            vec![ManifestEntry::new(CandidateFile::new("a.mkv", 1)).with_link("https://x/a")],
            &["https://x/other"],
        );
        assert_eq!(snap.paired_link(0).as_deref(), Some("https://x/a"));
    }

    #[test]
    fn test_paired_link_by_position_among_selected() {
        let snap = snapshot(
            vec![
                ManifestEntry::new(CandidateFile::new("Show/ep01.mkv", 1)),
                ManifestEntry::new(CandidateFile::new("Show/notes.txt", 1)).unselected(),
                ManifestEntry::new(CandidateFile::new("Show/ep02.mkv", 1)),
            ],
            &["https://rd/d/AAA", "https://rd/d/BBB"],
        );
        assert_eq!(snap.paired_link(2).as_deref(), Some("https://rd/d/BBB"));
        assert_eq!(snap.paired_link(0).as_deref(), Some("https://rd/d/AAA"));
        assert_eq!(snap.paired_link(1), None);
    }

    #[test]
    fn test_paired_link_by_file_name() {
        let snap = snapshot(
            vec![
                ManifestEntry::new(CandidateFile::new("Show/ep01.mkv", 1)),
                ManifestEntry::new(CandidateFile::new("Show/ep02.mkv", 1)),
            ],
            &["https://host/dl/ep02.mkv", "https://host/dl/ep01.mkv"],
        );
        assert_eq!(snap.paired_link(0).as_deref(), Some("https://host/dl/ep01.mkv"));
    }

    #[test]
    fn test_file_choice_param() {
        assert_eq!(FileChoice::One("3".to_string()).as_param(), "3");
        assert_eq!(FileChoice::All.as_param(), "all");
    }
}
