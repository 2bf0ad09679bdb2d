//! Torrent relevance filtering.
//!
//! Fetches each listing's file manifest and keeps only torrents that contain
//! the requested episode. Manifest fetches run concurrently but results are
//! consumed in input order, so the final seeder sort stays stable on ties.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::matching::{match_by_title, EpisodeTarget};
use crate::metrics;

use super::{ManifestFetcher, TorrentCandidate, TorrentIndex};

/// Keep the candidates whose manifest contains `target`, sorted by seeders
/// (descending, stable).
///
/// A failed manifest fetch drops that candidate only. Targets without a
/// title reject every candidate.
pub async fn find_relevant_torrents(
    candidates: Vec<TorrentCandidate>,
    target: &EpisodeTarget,
    fetcher: &dyn ManifestFetcher,
    max_parallel_fetches: usize,
) -> Vec<TorrentCandidate> {
    if target.title().is_none() {
        info!(
            episode = target.number,
            candidates = candidates.len(),
            "No episode title, cannot assess torrent relevance"
        );
        metrics::TORRENT_FILTER_RESULTS
            .with_label_values(&["rejected"])
            .inc_by(candidates.len() as u64);
        return Vec::new();
    }

    let fetched: Vec<_> = stream::iter(candidates)
        .map(|candidate| async move {
            let manifest = fetcher.fetch_manifest(&candidate).await;
            (candidate, manifest)
        })
        .buffered(max_parallel_fetches.max(1))
        .collect()
        .await;

    let mut relevant = Vec::new();

    for (mut candidate, manifest) in fetched {
        let files = match manifest {
            Ok(files) => files,
            Err(e) => {
                warn!(title = %candidate.title, error = %e, "Failed to fetch torrent file list");
                metrics::TORRENT_FILTER_RESULTS
                    .with_label_values(&["fetch_failed"])
                    .inc();
                continue;
            }
        };

        match match_by_title(&files, target).cloned() {
            Some(matched) => {
                debug!(title = %candidate.title, file = %matched.name, "Torrent contains episode");
                candidate.is_pack = files.len() > 1;
                candidate.matched_file = Some(matched);
                candidate.file_manifest = files;
                metrics::TORRENT_FILTER_RESULTS
                    .with_label_values(&["kept"])
                    .inc();
                relevant.push(candidate);
            }
            None => {
                debug!(title = %candidate.title, files = files.len(), "Torrent does not contain episode");
                metrics::TORRENT_FILTER_RESULTS
                    .with_label_values(&["rejected"])
                    .inc();
            }
        }
    }

    relevant.sort_by(|a, b| b.seeders.cmp(&a.seeders));
    relevant
}

/// Searches an index for an anime and filters the listings down to the
/// torrents containing a given episode.
pub struct TorrentFinder {
    index: Arc<dyn TorrentIndex>,
    fetcher: Arc<dyn ManifestFetcher>,
    max_parallel_fetches: usize,
}

impl TorrentFinder {
    pub fn new(
        index: Arc<dyn TorrentIndex>,
        fetcher: Arc<dyn ManifestFetcher>,
        max_parallel_fetches: usize,
    ) -> Self {
        Self {
            index,
            fetcher,
            max_parallel_fetches,
        }
    }

    /// Ranked torrents for `target`. Never fails: index errors yield an
    /// empty list.
    pub async fn find_relevant_torrents(
        &self,
        anime_title: &str,
        target: &EpisodeTarget,
    ) -> Vec<TorrentCandidate> {
        if target.title().is_none() {
            info!(
                anime = %anime_title,
                episode = target.number,
                "Missing episode title, skipping torrent search"
            );
            return Vec::new();
        }

        let candidates = match self.index.search(anime_title).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(index = self.index.name(), anime = %anime_title, error = %e, "Torrent search failed");
                return Vec::new();
            }
        };

        let relevant = find_relevant_torrents(
            candidates,
            target,
            self.fetcher.as_ref(),
            self.max_parallel_fetches,
        )
        .await;

        info!(
            anime = %anime_title,
            episode = target.number,
            found = relevant.len(),
            "Relevant torrents found"
        );
        relevant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::CandidateFile;
    use crate::searcher::SearchError;
    use crate::testing::{fixtures, MockTorrentIndex};

    fn manifest(names: &[&str]) -> Vec<CandidateFile> {
        names.iter().map(|n| CandidateFile::new(*n, 100)).collect()
    }

    #[tokio::test]
    async fn test_keeps_only_torrents_with_episode_sorted_by_seeders() {
        let index = MockTorrentIndex::new();
        let a = fixtures::torrent_candidate("Kai Pack A", "aaa", 5);
        let b = fixtures::torrent_candidate("Kai Other", "bbb", 50);
        let c = fixtures::torrent_candidate("Kai Pack C", "ccc", 20);
        index
            .set_manifest("aaa", manifest(&["Kai - 04 - Le Retour.mkv", "Kai - 05 - Le Duel.mkv"]))
            .await;
        index.set_manifest("bbb", manifest(&["Kai - 09 - Autre.mkv"])).await;
        index.set_manifest("ccc", manifest(&["Kai - 05 - Le Duel.mkv"])).await;

        let target = EpisodeTarget::titled(5, "Le Duel");
        let relevant = find_relevant_torrents(vec![a, b, c], &target, &index, 2).await;

        let titles: Vec<&str> = relevant.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Kai Pack C", "Kai Pack A"]);
        assert!(relevant[1].is_pack);
        assert!(!relevant[0].is_pack);
        assert_eq!(
            relevant[1].matched_file.as_ref().unwrap().name,
            "Kai - 05 - Le Duel.mkv"
        );
        assert_eq!(relevant[1].file_manifest.len(), 2);
    }

    #[tokio::test]
    async fn test_seeder_ties_keep_input_order() {
        let index = MockTorrentIndex::new();
        let candidates: Vec<_> = ["t1", "t2", "t3"]
            .iter()
            .map(|h| fixtures::torrent_candidate(h, h, 10))
            .collect();
        for h in ["t1", "t2", "t3"] {
            index.set_manifest(h, manifest(&["Kai 05 - Duel.mkv"])).await;
        }
        // Slow the first fetch so completion order differs from input order.
        index.set_fetch_delay("t1", std::time::Duration::from_millis(30)).await;

        let target = EpisodeTarget::titled(5, "Duel");
        let relevant = find_relevant_torrents(candidates, &target, &index, 3).await;
        let titles: Vec<&str> = relevant.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["t1", "t2", "t3"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_excludes_only_that_candidate() {
        let index = MockTorrentIndex::new();
        let ok = fixtures::torrent_candidate("ok", "okhash", 1);
        let broken = fixtures::torrent_candidate("broken", "brokenhash", 99);
        index.set_manifest("okhash", manifest(&["Kai 05 - Duel.mkv"])).await;
        index
            .set_manifest_error("brokenhash", SearchError::Timeout)
            .await;

        let target = EpisodeTarget::titled(5, "Duel");
        let relevant = find_relevant_torrents(vec![broken, ok], &target, &index, 2).await;
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].title, "ok");
    }

    #[tokio::test]
    async fn test_missing_title_rejects_everything() {
        let index = MockTorrentIndex::new();
        index.set_manifest("aaa", manifest(&["Kai - 05.mkv"])).await;
        let candidates = vec![fixtures::torrent_candidate("a", "aaa", 1)];

        let relevant = find_relevant_torrents(candidates, &EpisodeTarget::new(5), &index, 1).await;
        assert!(relevant.is_empty());
        assert_eq!(index.fetch_count().await, 0);
    }

    #[tokio::test]
    async fn test_finder_searches_and_filters() {
        let index = Arc::new(MockTorrentIndex::new());
        index
            .set_results(vec![
                fixtures::torrent_candidate("Kai Film 05", "f05", 12),
                fixtures::torrent_candidate("Kai Film 06", "f06", 40),
            ])
            .await;
        index.set_manifest("f05", manifest(&["Kai Film 05 - Le Duel.mkv"])).await;
        index.set_manifest("f06", manifest(&["Kai Film 06 - Suite.mkv"])).await;

        let finder = TorrentFinder::new(index.clone(), index.clone(), 4);
        let relevant = finder
            .find_relevant_torrents("Kai", &EpisodeTarget::titled(5, "Le Duel"))
            .await;

        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].title, "Kai Film 05");
        assert_eq!(index.recorded_queries().await, vec!["Kai".to_string()]);
    }

    #[tokio::test]
    async fn test_finder_search_failure_yields_empty() {
        let index = Arc::new(MockTorrentIndex::new());
        index
            .set_next_search_error(SearchError::ConnectionFailed("down".into()))
            .await;

        let finder = TorrentFinder::new(index.clone(), index.clone(), 4);
        let relevant = finder
            .find_relevant_torrents("Kai", &EpisodeTarget::titled(5, "Duel"))
            .await;
        assert!(relevant.is_empty());
    }

    #[tokio::test]
    async fn test_finder_without_title_skips_search() {
        let index = Arc::new(MockTorrentIndex::new());
        let finder = TorrentFinder::new(index.clone(), index.clone(), 4);
        let relevant = finder.find_relevant_torrents("Kai", &EpisodeTarget::new(5)).await;
        assert!(relevant.is_empty());
        assert!(index.recorded_queries().await.is_empty());
    }
}
