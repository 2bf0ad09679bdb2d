//! AllDebrid adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::matching::CandidateFile;

use super::{
    send, DebridError, DebridProvider, ManifestEntry, ProviderKind, ProviderSnapshot,
    ResolutionStatus,
};

const KIND: ProviderKind = ProviderKind::AllDebrid;

/// AllDebrid v4 client. Authenticates with `agent` + `apikey` query parameters.
pub struct AllDebridProvider {
    client: Client,
    base_url: String,
    api_key: String,
    agent: String,
}

/// Every AllDebrid response is wrapped in `{status, data}`.
#[derive(Debug, Deserialize)]
struct AdEnvelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    error: Option<AdError>,
}

#[derive(Debug, Deserialize)]
struct AdError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl<T> AdEnvelope<T> {
    fn into_data(self) -> Result<T, DebridError> {
        if self.status != "success" {
            let detail = self
                .error
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|| self.status.clone());
            if detail.starts_with("AUTH_") {
                return Err(DebridError::InvalidCredentials(detail));
            }
            return Err(DebridError::Api(detail));
        }
        self.data
            .ok_or_else(|| DebridError::Parse("success response without data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct AdUpload {
    #[serde(default)]
    magnets: Vec<AdUploadedMagnet>,
}

#[derive(Debug, Deserialize)]
struct AdUploadedMagnet {
    id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AdStatus {
    magnets: AdMagnet,
}

#[derive(Debug, Deserialize)]
struct AdMagnet {
    #[serde(default)]
    status: String,
    #[serde(default)]
    links: Vec<AdLink>,
}

#[derive(Debug, Deserialize)]
struct AdLink {
    link: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct AdUnlock {
    link: String,
}

impl AllDebridProvider {
    pub fn new(
        client: Client,
        base_url: &str,
        api_key: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            agent: agent.into(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, DebridError> {
        let request = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("agent", self.agent.as_str()), ("apikey", self.api_key.as_str())])
            .query(params);
        let envelope: AdEnvelope<T> = send(KIND, request).await?.json(KIND)?;
        envelope.into_data()
    }

    /// Upload returns the id of an already-known magnet too.
    async fn upload(&self, magnet_link: &str) -> Result<String, DebridError> {
        let upload: AdUpload = self
            .get("/magnet/upload", &[("magnets", magnet_link)])
            .await?;
        upload
            .magnets
            .into_iter()
            .next()
            .and_then(|m| m.id)
            .map(|id| match id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .ok_or_else(|| DebridError::Parse("upload response without magnet id".to_string()))
    }
}

/// Map an AllDebrid status word.
pub fn map_ad_status(status: &str) -> ResolutionStatus {
    match status {
        "Queued" | "Downloading" | "Uploading" => ResolutionStatus::Downloading,
        "Ready" => ResolutionStatus::Completed,
        _ => ResolutionStatus::Error,
    }
}

fn snapshot_from_magnet(id: String, magnet: AdMagnet) -> ProviderSnapshot {
    let manifest = magnet
        .links
        .into_iter()
        .map(|l| ManifestEntry::new(CandidateFile::new(l.filename, l.size)).with_link(l.link))
        .collect();
    ProviderSnapshot {
        item_id: id,
        status: magnet.status,
        manifest,
        links: Vec::new(),
    }
}

#[async_trait]
impl DebridProvider for AllDebridProvider {
    fn kind(&self) -> ProviderKind {
        KIND
    }

    async fn check_credentials(&self) -> bool {
        match self.get::<serde_json::Value>("/user", &[]).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "AllDebrid credential check failed");
                false
            }
        }
    }

    async fn submit_and_forget(&self, magnet_link: &str) -> Option<String> {
        match self.upload(magnet_link).await {
            Ok(id) => {
                info!(id = %id, "Magnet submitted to AllDebrid");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "AllDebrid submission failed");
                None
            }
        }
    }

    async fn get_status_and_files(
        &self,
        magnet_link: &str,
    ) -> Result<ProviderSnapshot, DebridError> {
        let id = self.upload(magnet_link).await?;
        let status: AdStatus = self.get("/magnet/status", &[("id", id.as_str())]).await?;
        debug!(id = %id, status = %status.magnets.status, links = status.magnets.links.len(), "AllDebrid magnet status");
        Ok(snapshot_from_magnet(id, status.magnets))
    }

    fn map_status(&self, snapshot: &ProviderSnapshot) -> ResolutionStatus {
        map_ad_status(&snapshot.status)
    }

    async fn de_restrict_link(&self, url: &str) -> Result<String, DebridError> {
        let unlocked: AdUnlock = self.get("/link/unlock", &[("link", url)]).await?;
        Ok(unlocked.link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_ad_status() {
        assert_eq!(map_ad_status("Queued"), ResolutionStatus::Downloading);
        assert_eq!(map_ad_status("Downloading"), ResolutionStatus::Downloading);
        assert_eq!(map_ad_status("Uploading"), ResolutionStatus::Downloading);
        assert_eq!(map_ad_status("Ready"), ResolutionStatus::Completed);
        assert_eq!(map_ad_status("Error"), ResolutionStatus::Error);
        assert_eq!(map_ad_status("File Error"), ResolutionStatus::Error);
        assert_eq!(map_ad_status("ready"), ResolutionStatus::Error);
        assert_eq!(map_ad_status("Processing"), ResolutionStatus::Error);
    }

    #[test]
    fn test_envelope_error_is_reported() {
        let envelope: AdEnvelope<AdUpload> = serde_json::from_value(serde_json::json!({
            "status": "error",
            "error": {"code": "AUTH_BAD_APIKEY", "message": "The auth apikey is invalid"}
        }))
        .unwrap();
        assert!(matches!(
            envelope.into_data(),
            Err(DebridError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_snapshot_attaches_links_to_files() {
        let status: AdStatus = serde_json::from_value(serde_json::json!({
            "magnets": {
                "status": "Ready",
                "links": [
                    {"link": "https://alldebrid.com/f/AAA", "filename": "Show - 01.mkv", "size": 500},
                    {"link": "https://alldebrid.com/f/BBB", "filename": "Show - 02.mkv", "size": 600}
                ]
            }
        }))
        .unwrap();

        let snap = snapshot_from_magnet("42".to_string(), status.magnets);
        assert_eq!(snap.item_id, "42");
        assert_eq!(snap.manifest.len(), 2);
        assert_eq!(snap.manifest[1].file.size_bytes, 600);
        assert_eq!(snap.paired_link(1).as_deref(), Some("https://alldebrid.com/f/BBB"));
    }

    #[test]
    fn test_upload_id_numeric_or_string() {
        let upload: AdUpload = serde_json::from_value(serde_json::json!({
            "magnets": [{"id": 12345, "hash": "abc"}]
        }))
        .unwrap();
        let id = upload.magnets[0].id.clone().unwrap();
        assert_eq!(id.to_string(), "12345");
    }
}
