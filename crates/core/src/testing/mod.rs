//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits,
//! so the resolver and the torrent finder can be exercised without network
//! access.
//!
//! # Example
//!
//! ```rust,ignore
//! use kaistream_core::testing::{fixtures, MockProvider, MockProviderFactory};
//!
//! let provider = Arc::new(MockProvider::new());
//! provider.push_status(Ok(fixtures::snapshot("ready", &[("Kai - 05.mkv", 1)]))).await;
//! let resolver = Resolver::new(config, Arc::new(MockProviderFactory::new(provider.clone())));
//! ```

mod mock_provider;
mod mock_torrent_index;

pub use mock_provider::{status, MockProvider, MockProviderFactory, ProviderCall};
pub use mock_torrent_index::MockTorrentIndex;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::debrid::{ManifestEntry, ProviderSnapshot};
    use crate::matching::CandidateFile;
    use crate::searcher::TorrentCandidate;

    /// A magnet link for `info_hash`.
    pub fn magnet(info_hash: &str) -> String {
        format!("magnet:?xt=urn:btih:{}&dn=test", info_hash)
    }

    /// Create a test torrent candidate with reasonable defaults.
    pub fn torrent_candidate(title: &str, info_hash: &str, seeders: u32) -> TorrentCandidate {
        let mut candidate = TorrentCandidate::new(title, magnet(info_hash));
        candidate.seeders = seeders;
        candidate.leechers = 1;
        candidate.size_text = "1.2 GiB".to_string();
        candidate.details_url = Some(format!("https://nyaa.example/view/{}", info_hash));
        candidate
    }

    /// A provider report with files named and sized as given.
    ///
    /// File ids are their positions; every file is selected and unlinked.
    pub fn snapshot(status: &str, files: &[(&str, u64)]) -> ProviderSnapshot {
        ProviderSnapshot {
            item_id: "mock-item".to_string(),
            status: status.to_string(),
            manifest: files
                .iter()
                .enumerate()
                .map(|(i, (name, size))| {
                    ManifestEntry::new(CandidateFile::new(*name, *size).with_id(i.to_string()))
                })
                .collect(),
            links: Vec::new(),
        }
    }

    /// Like [`snapshot`], with one loose link per file.
    pub fn linked_snapshot(status: &str, files: &[(&str, u64)]) -> ProviderSnapshot {
        let mut snap = snapshot(status, files);
        snap.links = (0..files.len())
            .map(|i| format!("https://provider.example/d/{}", i))
            .collect();
        snap
    }
}
