//! Real-Debrid adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::magnet;
use crate::matching::CandidateFile;

use super::{
    send, DebridError, DebridProvider, FileChoice, ManifestEntry, ProviderKind, ProviderSnapshot,
    ResolutionStatus,
};

const KIND: ProviderKind = ProviderKind::RealDebrid;

/// Real-Debrid REST client.
pub struct RealDebridProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct RdTorrentSummary {
    id: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    added: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RdTorrentInfo {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    files: Vec<RdFile>,
    #[serde(default)]
    links: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RdFile {
    id: u64,
    #[serde(default)]
    path: String,
    #[serde(default)]
    bytes: u64,
    #[serde(default)]
    selected: u8,
}

#[derive(Debug, Deserialize)]
struct RdAddMagnet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RdErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RdUnrestricted {
    download: String,
}

/// Real-Debrid error code for "resource already exists".
const ALREADY_EXISTS: i64 = 2;

impl RealDebridProvider {
    pub fn new(client: Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Most recently added item with this hash.
    async fn find_by_hash(&self, info_hash: &str) -> Result<Option<String>, DebridError> {
        let request = self
            .client
            .get(self.url("/torrents"))
            .bearer_auth(&self.api_key)
            .query(&[("limit", "500")]);
        let exchange = send(KIND, request).await?;
        if exchange.status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let torrents: Vec<RdTorrentSummary> = exchange.json(KIND)?;
        Ok(most_recent_match(torrents, info_hash))
    }

    async fn torrent_info(&self, id: &str) -> Result<RdTorrentInfo, DebridError> {
        let request = self
            .client
            .get(self.url(&format!("/torrents/info/{}", id)))
            .bearer_auth(&self.api_key);
        send(KIND, request).await?.json(KIND)
    }

    async fn add_magnet(&self, magnet_link: &str) -> Result<String, DebridError> {
        let request = self
            .client
            .post(self.url("/torrents/addMagnet"))
            .bearer_auth(&self.api_key)
            .form(&[("magnet", magnet_link)]);
        let exchange = send(KIND, request).await?;

        if !exchange.status.is_success() {
            if let Ok(body) = exchange.decode::<RdErrorBody>() {
                if body.error_code == Some(ALREADY_EXISTS) {
                    debug!(error = %body.error, "Magnet already on Real-Debrid");
                    let hash = magnet::info_hash(magnet_link)
                        .ok_or_else(|| DebridError::InvalidMagnet(magnet_link.to_string()))?;
                    return self.find_by_hash(&hash).await?.ok_or_else(|| {
                        DebridError::NotFound(format!("existing torrent {}", hash))
                    });
                }
            }
        }

        let added: RdAddMagnet = exchange.json(KIND)?;
        Ok(added.id)
    }
}

fn most_recent_match(torrents: Vec<RdTorrentSummary>, info_hash: &str) -> Option<String> {
    // RFC 3339 timestamps from the API sort lexicographically.
    torrents
        .into_iter()
        .filter(|t| t.hash.eq_ignore_ascii_case(info_hash))
        .max_by(|a, b| a.added.cmp(&b.added))
        .map(|t| t.id)
}

fn snapshot_from_info(info: RdTorrentInfo) -> ProviderSnapshot {
    let manifest = info
        .files
        .into_iter()
        .map(|f| {
            let entry =
                ManifestEntry::new(CandidateFile::new(f.path, f.bytes).with_id(f.id.to_string()));
            if f.selected == 1 {
                entry
            } else {
                entry.unselected()
            }
        })
        .collect();
    ProviderSnapshot {
        item_id: info.id,
        status: info.status,
        manifest,
        links: info.links,
    }
}

/// Map a Real-Debrid status word.
pub fn map_rd_status(status: &str) -> ResolutionStatus {
    match status {
        "magnet_conversion" | "waiting_files_selection" | "queued" | "downloading"
        | "compressing" | "uploading" => ResolutionStatus::Downloading,
        "downloaded" => ResolutionStatus::Completed,
        _ => ResolutionStatus::Error,
    }
}

#[async_trait]
impl DebridProvider for RealDebridProvider {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    async fn check_credentials(&self) -> bool {
        let request = self.client.get(self.url("/user")).bearer_auth(&self.api_key);
        match send(KIND, request).await {
            Ok(exchange) => exchange.status.is_success(),
            Err(e) => {
                warn!(error = %e, "Real-Debrid credential check failed");
                false
            }
        }
    }

    async fn submit_and_forget(&self, magnet_link: &str) -> Option<String> {
        match self.add_magnet(magnet_link).await {
            Ok(id) => {
                info!(id = %id, "Magnet submitted to Real-Debrid");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "Real-Debrid submission failed");
                None
            }
        }
    }

    async fn get_status_and_files(
        &self,
        magnet_link: &str,
    ) -> Result<ProviderSnapshot, DebridError> {
        let hash = magnet::info_hash(magnet_link)
            .ok_or_else(|| DebridError::InvalidMagnet(magnet_link.to_string()))?;
        let id = self
            .find_by_hash(&hash)
            .await?
            .ok_or_else(|| DebridError::NotFound(format!("torrent {}", hash)))?;
        let info = self.torrent_info(&id).await?;
        debug!(id = %id, status = %info.status, files = info.files.len(), "Real-Debrid torrent info");
        Ok(snapshot_from_info(info))
    }

    fn map_status(&self, snapshot: &ProviderSnapshot) -> ResolutionStatus {
        map_rd_status(&snapshot.status)
    }

    fn needs_file_selection(&self, snapshot: &ProviderSnapshot) -> bool {
        match snapshot.status.as_str() {
            "waiting_files_selection" => true,
            "downloaded" => snapshot.links.is_empty() && snapshot.has_unselected_files(),
            _ => false,
        }
    }

    async fn select_files(&self, item_id: &str, choice: &FileChoice) -> Result<(), DebridError> {
        let request = self
            .client
            .post(self.url(&format!("/torrents/selectFiles/{}", item_id)))
            .bearer_auth(&self.api_key)
            .form(&[("files", choice.as_param())]);
        send(KIND, request).await?.ensure_success(KIND)?;
        debug!(id = %item_id, files = %choice.as_param(), "Real-Debrid files selected");
        Ok(())
    }

    async fn de_restrict_link(&self, url: &str) -> Result<String, DebridError> {
        let request = self
            .client
            .post(self.url("/unrestrict/link"))
            .bearer_auth(&self.api_key)
            .form(&[("link", url)]);
        let unrestricted: RdUnrestricted = send(KIND, request).await?.json(KIND)?;
        Ok(unrestricted.download)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_rd_status_in_progress() {
        for status in [
            "magnet_conversion",
            "waiting_files_selection",
            "queued",
            "downloading",
            "compressing",
            "uploading",
        ] {
            assert_eq!(map_rd_status(status), ResolutionStatus::Downloading, "{status}");
        }
    }

    #[test]
    fn test_map_rd_status_terminal() {
        assert_eq!(map_rd_status("downloaded"), ResolutionStatus::Completed);
        assert_eq!(map_rd_status("magnet_error"), ResolutionStatus::Error);
        assert_eq!(map_rd_status("virus"), ResolutionStatus::Error);
        assert_eq!(map_rd_status("dead"), ResolutionStatus::Error);
        assert_eq!(map_rd_status("something_new"), ResolutionStatus::Error);
    }

    #[test]
    fn test_most_recent_match_picks_latest_added() {
        let torrents: Vec<RdTorrentSummary> = serde_json::from_value(serde_json::json!([
            {"id": "OLD", "hash": "ABCDEF", "added": "2024-01-01T10:00:00.000Z"},
            {"id": "OTHER", "hash": "123456", "added": "2025-01-01T10:00:00.000Z"},
            {"id": "NEW", "hash": "abcdef", "added": "2024-06-01T10:00:00.000Z"}
        ]))
        .unwrap();
        assert_eq!(most_recent_match(torrents, "abcdef").as_deref(), Some("NEW"));
    }

    #[test]
    fn test_most_recent_match_none() {
        assert_eq!(most_recent_match(Vec::new(), "abcdef"), None);
    }

    #[test]
    fn test_snapshot_from_info() {
        let info: RdTorrentInfo = serde_json::from_value(serde_json::json!({
            "id": "T1",
            "status": "downloaded",
            "files": [
                {"id": 1, "path": "/Show/Show - 01.mkv", "bytes": 100, "selected": 1},
                {"id": 2, "path": "/Show/readme.txt", "bytes": 1, "selected": 0}
            ],
            "links": ["https://real-debrid.com/d/AAA"]
        }))
        .unwrap();

        let snap = snapshot_from_info(info);
        assert_eq!(snap.item_id, "T1");
        assert_eq!(snap.manifest.len(), 2);
        assert!(snap.manifest[0].selected);
        assert!(!snap.manifest[1].selected);
        assert_eq!(snap.manifest[0].file.provider_file_id.as_deref(), Some("1"));
        assert_eq!(snap.paired_link(0).as_deref(), Some("https://real-debrid.com/d/AAA"));
    }

    #[test]
    fn test_needs_file_selection() {
        let provider = RealDebridProvider::new(Client::new(), "http://rd", "key");
        let mut snap = ProviderSnapshot::new("T1", "waiting_files_selection");
        assert!(provider.needs_file_selection(&snap));

        snap.status = "downloaded".to_string();
        snap.manifest = vec![ManifestEntry::new(CandidateFile::new("a.mkv", 1)).unselected()];
        assert!(provider.needs_file_selection(&snap));

        snap.links = vec!["https://rd/d/A".to_string()];
        assert!(!provider.needs_file_selection(&snap));
    }
}
