//! Mock torrent index for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::matching::CandidateFile;
use crate::searcher::{ManifestFetcher, SearchError, TorrentCandidate, TorrentIndex};

/// Mock implementation of both [`TorrentIndex`] and [`ManifestFetcher`].
///
/// Manifests are keyed by the candidate's info hash; unknown hashes
/// return an empty manifest.
///
/// # Example
///
/// ```rust,ignore
/// use kaistream_core::testing::{MockTorrentIndex, fixtures};
///
/// let index = MockTorrentIndex::new();
/// index.set_results(vec![fixtures::torrent_candidate("Kai 05", "abc", 10)]).await;
/// index.set_manifest("abc", vec![CandidateFile::new("Kai - 05.mkv", 1)]).await;
/// ```
#[derive(Debug, Default)]
pub struct MockTorrentIndex {
    results: Arc<RwLock<Vec<TorrentCandidate>>>,
    queries: Arc<RwLock<Vec<String>>>,
    next_search_error: Arc<RwLock<Option<SearchError>>>,
    manifests: Arc<RwLock<HashMap<String, Vec<CandidateFile>>>>,
    /// One-shot fetch errors per hash.
    manifest_errors: Arc<RwLock<HashMap<String, SearchError>>>,
    fetch_delays: Arc<RwLock<HashMap<String, Duration>>>,
    fetches: AtomicUsize,
}

impl MockTorrentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listings returned by every search.
    pub async fn set_results(&self, results: Vec<TorrentCandidate>) {
        *self.results.write().await = results;
    }

    /// Make the next search fail.
    pub async fn set_next_search_error(&self, error: SearchError) {
        *self.next_search_error.write().await = Some(error);
    }

    pub async fn set_manifest(&self, info_hash: &str, files: Vec<CandidateFile>) {
        self.manifests
            .write()
            .await
            .insert(info_hash.to_lowercase(), files);
    }

    /// Make the next manifest fetch for this hash fail.
    pub async fn set_manifest_error(&self, info_hash: &str, error: SearchError) {
        self.manifest_errors
            .write()
            .await
            .insert(info_hash.to_lowercase(), error);
    }

    /// Delay manifest fetches for this hash.
    pub async fn set_fetch_delay(&self, info_hash: &str, delay: Duration) {
        self.fetch_delays
            .write()
            .await
            .insert(info_hash.to_lowercase(), delay);
    }

    /// Queries searched so far.
    pub async fn recorded_queries(&self) -> Vec<String> {
        self.queries.read().await.clone()
    }

    /// Number of manifest fetches attempted.
    pub async fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TorrentIndex for MockTorrentIndex {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, query: &str) -> Result<Vec<TorrentCandidate>, SearchError> {
        self.queries.write().await.push(query.to_string());
        if let Some(error) = self.next_search_error.write().await.take() {
            return Err(error);
        }
        Ok(self.results.read().await.clone())
    }
}

#[async_trait]
impl ManifestFetcher for MockTorrentIndex {
    async fn fetch_manifest(
        &self,
        candidate: &TorrentCandidate,
    ) -> Result<Vec<CandidateFile>, SearchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let hash = candidate.info_hash.clone().unwrap_or_default();

        let delay = self.fetch_delays.read().await.get(&hash).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.manifest_errors.write().await.remove(&hash) {
            return Err(error);
        }
        Ok(self
            .manifests
            .read()
            .await
            .get(&hash)
            .cloned()
            .unwrap_or_default())
    }
}
