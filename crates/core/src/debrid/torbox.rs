//! TorBox adapter.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::magnet;
use crate::matching::CandidateFile;

use super::{
    send, DebridError, DebridProvider, ManifestEntry, ProviderKind, ProviderSnapshot,
    ResolutionStatus,
};

const KIND: ProviderKind = ProviderKind::Torbox;

/// TorBox client. Links from `requestdl` are already direct.
pub struct TorboxProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TbResponse<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    detail: Option<String>,
}

impl<T> TbResponse<T> {
    fn into_data(self) -> Result<T, DebridError> {
        if !self.success {
            return Err(DebridError::Api(
                self.detail.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| DebridError::Parse("success response without data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TbTorrent {
    id: serde_json::Value,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    download_state: Option<String>,
    #[serde(default)]
    files: Option<Vec<TbFile>>,
}

#[derive(Debug, Deserialize)]
struct TbFile {
    id: serde_json::Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct TbCreated {
    torrent_id: serde_json::Value,
}

fn id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl TorboxProvider {
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

    async fn my_list(&self) -> Result<Vec<TbTorrent>, DebridError> {
        let request = self
            .client
            .get(self.url("/api/torrents/mylist"))
            .bearer_auth(&self.api_key);
        let response: TbResponse<Vec<TbTorrent>> = send(KIND, request).await?.json(KIND)?;
        response.into_data()
    }

    async fn find_by_hash(&self, info_hash: &str) -> Result<Option<String>, DebridError> {
        Ok(self
            .my_list()
            .await?
            .into_iter()
            .find(|t| t.hash.eq_ignore_ascii_case(info_hash))
            .map(|t| id_string(&t.id)))
    }

    async fn torrent_info(&self, id: &str) -> Result<TbTorrent, DebridError> {
        let request = self
            .client
            .get(self.url("/api/torrents/mylist"))
            .bearer_auth(&self.api_key)
            .query(&[("id", id), ("bypass_cache", "true")]);
        let response: TbResponse<TbTorrent> = send(KIND, request).await?.json(KIND)?;
        response.into_data()
    }

    async fn create(&self, magnet_link: &str) -> Result<String, DebridError> {
        let form = multipart::Form::new().text("magnet", magnet_link.to_string());
        let request = self
            .client
            .post(self.url("/api/torrents/createtorrent"))
            .bearer_auth(&self.api_key)
            .multipart(form);
        let response: TbResponse<TbCreated> = send(KIND, request).await?.json(KIND)?;
        Ok(id_string(&response.into_data()?.torrent_id))
    }
}

/// Map a TorBox item. TorBox has no completion word: a listed file set means ready.
pub fn map_tb_status(download_state: &str, file_count: usize) -> ResolutionStatus {
    let state = download_state.to_lowercase();
    if state.contains("error") || state.contains("failed") {
        ResolutionStatus::Error
    } else if file_count > 0 {
        ResolutionStatus::Completed
    } else {
        ResolutionStatus::Downloading
    }
}

fn snapshot_from_torrent(torrent: TbTorrent) -> ProviderSnapshot {
    let manifest = torrent
        .files
        .unwrap_or_default()
        .into_iter()
        .map(|f| ManifestEntry::new(CandidateFile::new(f.name, f.size).with_id(id_string(&f.id))))
        .collect();
    ProviderSnapshot {
        item_id: id_string(&torrent.id),
        status: torrent.download_state.unwrap_or_default(),
        manifest,
        links: Vec::new(),
    }
}

#[async_trait]
impl DebridProvider for TorboxProvider {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    async fn check_credentials(&self) -> bool {
        match self.my_list().await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "TorBox credential check failed");
                false
            }
        }
    }

    async fn submit_and_forget(&self, magnet_link: &str) -> Option<String> {
        let existing = match magnet::info_hash(magnet_link) {
            Some(hash) => self.find_by_hash(&hash).await,
            None => {
                warn!("Magnet link has no info hash, not submitting to TorBox");
                return None;
            }
        };
        match existing {
            Ok(Some(id)) => {
                debug!(id = %id, "Torrent already on TorBox");
                return Some(id);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "TorBox lookup failed");
                return None;
            }
        }

        match self.create(magnet_link).await {
            Ok(id) => {
                info!(id = %id, "Magnet submitted to TorBox");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "TorBox submission failed");
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
        let torrent = self.torrent_info(&id).await?;
        Ok(snapshot_from_torrent(torrent))
    }

    fn map_status(&self, snapshot: &ProviderSnapshot) -> ResolutionStatus {
        map_tb_status(&snapshot.status, snapshot.manifest.len())
    }

    async fn link_for(
        &self,
        snapshot: &ProviderSnapshot,
        index: usize,
    ) -> Result<Option<String>, DebridError> {
        let Some(file_id) = snapshot
            .manifest
            .get(index)
            .and_then(|e| e.file.provider_file_id.clone())
        else {
            return Ok(None);
        };

        let request = self
            .client
            .get(self.url("/api/torrents/requestdl"))
            .query(&[
                ("token", self.api_key.as_str()),
                ("torrent_id", snapshot.item_id.as_str()),
                ("file_id", file_id.as_str()),
                ("zip_link", "false"),
            ]);
        let response: TbResponse<String> = send(KIND, request).await?.json(KIND)?;
        Ok(Some(response.into_data()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_tb_status() {
        assert_eq!(map_tb_status("downloading", 0), ResolutionStatus::Downloading);
        assert_eq!(map_tb_status("", 0), ResolutionStatus::Downloading);
        assert_eq!(map_tb_status("cached", 3), ResolutionStatus::Completed);
        assert_eq!(map_tb_status("uploading", 1), ResolutionStatus::Completed);
        assert_eq!(map_tb_status("error", 3), ResolutionStatus::Error);
        assert_eq!(map_tb_status("failed (no peers)", 0), ResolutionStatus::Error);
    }

    #[test]
    fn test_snapshot_from_torrent() {
        let torrent: TbTorrent = serde_json::from_value(serde_json::json!({
            "id": 77,
            "hash": "abcdef",
            "download_state": "cached",
            "files": [
                {"id": 0, "name": "Show/Show - 01.mkv", "size": 1000},
                {"id": 1, "name": "Show/Show - 02.mkv", "size": 1100}
            ]
        }))
        .unwrap();

        let snap = snapshot_from_torrent(torrent);
        assert_eq!(snap.item_id, "77");
        assert_eq!(snap.status, "cached");
        assert_eq!(snap.manifest[1].file.provider_file_id.as_deref(), Some("1"));
        assert!(snap.manifest.iter().all(|e| e.selected));
    }

    #[test]
    fn test_snapshot_without_files() {
        let torrent: TbTorrent =
            serde_json::from_value(serde_json::json!({"id": "9", "hash": "x"})).unwrap();
        let snap = snapshot_from_torrent(torrent);
        assert_eq!(snap.item_id, "9");
        assert!(snap.manifest.is_empty());
        assert_eq!(map_tb_status(&snap.status, snap.manifest.len()), ResolutionStatus::Downloading);
    }

    #[test]
    fn test_failed_response() {
        let response: TbResponse<String> =
            serde_json::from_value(serde_json::json!({"success": false, "detail": "bad token"}))
                .unwrap();
        let err = response.into_data().unwrap_err();
        assert!(err.to_string().contains("bad token"));
    }
}
