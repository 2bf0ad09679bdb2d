//! Types shared by the matcher and the selector.

use serde::{Deserialize, Serialize};

/// Extensions treated as playable video.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm"];

/// Markers of containers a browser can play without transcoding.
pub const WEB_READY_MARKERS: &[&str] = &[".mp4", ".webm", ".m3u8"];

/// One file inside a torrent or a provider manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFile {
    /// File name, possibly including path segments.
    pub name: String,
    /// Size in bytes (0 when unknown).
    #[serde(default)]
    pub size_bytes: u64,
    /// Provider-specific id used to request a download link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_file_id: Option<String>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            provider_file_id: None,
        }
    }

    /// Attach the provider's file id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.provider_file_id = Some(id.into());
        self
    }

    /// Whether the file has a video extension.
    pub fn is_video(&self) -> bool {
        is_video_file(&self.name)
    }

    /// Whether the file can take part in matching at all.
    pub fn is_usable(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Last path segment of the name.
    pub fn basename(&self) -> &str {
        basename(&self.name)
    }
}

/// The selection key: an episode number and an optional title.
///
/// Episode numbers start at 1. Request input goes through
/// [`EpisodeTarget::from_parts`], which refuses 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeTarget {
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl EpisodeTarget {
    /// Number-only target.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            title: None,
        }
    }

    pub fn titled(number: u32, title: impl Into<String>) -> Self {
        Self {
            number,
            title: non_blank(Some(title.into())),
        }
    }

    /// Build from request parameters. Blank titles are treated as absent.
    ///
    /// Returns `None` for episode 0.
    pub fn from_parts(number: u32, title: Option<String>) -> Option<Self> {
        if number == 0 {
            return None;
        }
        Some(Self {
            number,
            title: non_blank(title),
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

fn non_blank(title: Option<String>) -> Option<String> {
    title.filter(|t| !t.trim().is_empty())
}

/// Lower-cased text after the last `.`; empty when there is no dot.
pub fn file_extension(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

pub fn is_video_file(name: &str) -> bool {
    let ext = file_extension(name);
    VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// Whether a file name or URL points at a browser-playable container.
pub fn is_web_ready(name_or_url: &str) -> bool {
    let lower = name_or_url.to_lowercase();
    WEB_READY_MARKERS.iter().any(|m| lower.contains(m))
}

/// Last `/`-separated segment of a path or URL.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
