//! Episode matching and file selection.
//!
//! Everything in this module is a total function: lookups that find nothing
//! return `None` (or `false`), they never fail.
//!
//! - [`normalize`]: case-fold and strip diacritics for comparisons.
//! - [`select_episode`]: layered number/title/size matching over a file list.
//! - [`select_best_file`]: adapts provider file records, filters to video
//!   and delegates to the matcher.

mod episode_number;
mod matcher;
mod normalize;
mod selector;
mod types;

pub use episode_number::EpisodeNumberMatcher;
pub use matcher::{contains_episode, match_by_title, select_episode, select_episode_position};
pub use normalize::normalize;
pub use selector::{largest_video_file, select_best_file, FileRecord, SelectOptions, Selection};
pub use types::*;
