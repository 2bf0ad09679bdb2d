//! Magnet to playable link resolution.
//!
//! The resolver drives one debrid provider per request:
//! - **resolve**: locate or submit the torrent, poll until ready or timeout,
//!   pick the episode file and turn its link into a direct URL
//! - **initiate_download**: submit and return, preparing file selection in the
//!   background

mod runner;
mod types;

pub use runner::Resolver;
pub use types::{ResolveOutcome, ResolveState, ResolvedStream};
