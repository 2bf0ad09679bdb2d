//! Torrent index search and relevance filtering.
//!
//! `TorrentIndex` searches an index by free text, `ManifestFetcher` loads the
//! file list of a single listing, and [`find_relevant_torrents`] combines them
//! with the episode matcher.

mod nyaa;
mod relevance;
mod types;

pub use nyaa::{parse_size, NyaaClient};
pub use relevance::{find_relevant_torrents, TorrentFinder};
pub use types::*;
