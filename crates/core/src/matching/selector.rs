//! File selection over heterogeneous provider records.

use serde_json::Value;
use tracing::debug;

use super::matcher::{largest_position, select_episode_position};
use super::types::{CandidateFile, EpisodeTarget};

/// A provider-specific file record that can be viewed as a [`CandidateFile`].
///
/// Each provider names its fields differently (`path`/`bytes`,
/// `filename`/`size`, ...); implementations do the mapping once so the
/// matcher only ever sees the uniform shape.
pub trait FileRecord {
    fn to_candidate(&self) -> CandidateFile;
}

impl FileRecord for CandidateFile {
    fn to_candidate(&self) -> CandidateFile {
        self.clone()
    }
}

/// Loosely shaped JSON records: name from `name`, `filename` or `path`;
/// size from `size` or `bytes`; id from `id`, `fileId` or `file_id`.
impl FileRecord for Value {
    fn to_candidate(&self) -> CandidateFile {
        let name = ["name", "filename", "path"]
            .iter()
            .filter_map(|k| self.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        let size_bytes = ["size", "bytes"]
            .iter()
            .filter_map(|k| self.get(*k).and_then(Value::as_u64))
            .find(|s| *s > 0)
            .unwrap_or(0);

        let provider_file_id = ["id", "fileId", "file_id"]
            .iter()
            .filter_map(|k| self.get(*k))
            .find_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        CandidateFile {
            name: name.to_string(),
            size_bytes,
            provider_file_id,
        }
    }
}

/// Options for [`select_best_file`].
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Caller-asserted file position; used as-is when in range.
    pub forced_index: Option<usize>,
    /// Fall back to the largest video file when matching finds nothing.
    pub largest_video_fallback: bool,
}

impl SelectOptions {
    pub fn forced(index: usize) -> Self {
        Self {
            forced_index: Some(index),
            ..Default::default()
        }
    }
}

/// The chosen file and its position in the original record list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub file: CandidateFile,
}

/// Pick the file to play for `target` out of `records`.
pub fn select_best_file<R: FileRecord>(
    records: &[R],
    target: &EpisodeTarget,
    options: &SelectOptions,
) -> Option<Selection> {
    if let Some(index) = options.forced_index {
        if let Some(record) = records.get(index) {
            debug!(index, "Using forced file index");
            return Some(Selection {
                index,
                file: record.to_candidate(),
            });
        }
        debug!(index, len = records.len(), "Forced file index out of range, ignoring");
    }

    let (positions, videos): (Vec<usize>, Vec<CandidateFile>) = records
        .iter()
        .map(FileRecord::to_candidate)
        .enumerate()
        .filter(|(_, f)| f.is_usable() && f.is_video())
        .unzip();

    if videos.is_empty() {
        debug!(records = records.len(), "No video files to select from");
        return None;
    }

    let chosen = select_episode_position(&videos, target).or_else(|| {
        if options.largest_video_fallback {
            debug!(episode = target.number, "No episode match, using largest video file");
            largest_video_file(&videos)
        } else {
            None
        }
    });

    match chosen {
        Some(i) => Some(Selection {
            index: positions[i],
            file: videos[i].clone(),
        }),
        None => {
            debug!(
                episode = target.number,
                videos = videos.len(),
                "No video file matches the episode"
            );
            None
        }
    }
}

/// Position of the largest video file; ties go to the earliest.
pub fn largest_video_file(files: &[CandidateFile]) -> Option<usize> {
    largest_position(files, (0..files.len()).filter(|&i| files[i].is_video()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_forced_index_bypasses_matching() {
        let files = vec![
            CandidateFile::new("Show - 01.mkv", 10),
            CandidateFile::new("notes.txt", 1),
        ];
        let selection =
            select_best_file(&files, &EpisodeTarget::new(1), &SelectOptions::forced(1)).unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.file.name, "notes.txt");
    }

    #[test]
    fn test_forced_index_out_of_range_falls_back_to_matching() {
        let files = vec![CandidateFile::new("Show - 01.mkv", 10)];
        let selection =
            select_best_file(&files, &EpisodeTarget::new(1), &SelectOptions::forced(7)).unwrap();
        assert_eq!(selection.index, 0);
    }

    #[test]
    fn test_non_video_files_are_excluded() {
        let files = vec![
            CandidateFile::new("Show - 05.srt", 10),
            CandidateFile::new("Show - 05.nfo", 10),
            CandidateFile::new("Show - 05.mkv", 10),
        ];
        let selection =
            select_best_file(&files, &EpisodeTarget::new(5), &SelectOptions::default()).unwrap();
        assert_eq!(selection.index, 2);
        assert_eq!(selection.file.name, "Show - 05.mkv");
    }

    #[test]
    fn test_no_video_files_returns_none() {
        let files = vec![CandidateFile::new("readme.txt", 10)];
        assert!(select_best_file(&files, &EpisodeTarget::new(1), &SelectOptions::default()).is_none());
    }

    #[test]
    fn test_no_match_without_fallback_returns_none() {
        let files = vec![CandidateFile::new("Show - 02.mkv", 10)];
        assert!(select_best_file(&files, &EpisodeTarget::new(9), &SelectOptions::default()).is_none());
    }

    #[test]
    fn test_largest_video_fallback() {
        let files = vec![
            CandidateFile::new("Bonus.mkv", 10),
            CandidateFile::new("Feature.mkv", 900),
            CandidateFile::new("Huge.iso", 9000),
        ];
        let options = SelectOptions {
            forced_index: None,
            largest_video_fallback: true,
        };
        let selection = select_best_file(&files, &EpisodeTarget::new(9), &options).unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.file.name, "Feature.mkv");
    }

    #[test]
    fn test_json_records_with_varying_field_names() {
        let records = vec![
            json!({ "path": "/Kai/Kai - 01.mkv", "bytes": 100, "id": 1 }),
            json!({ "filename": "Kai - 02.mkv", "size": 200, "fileId": "b" }),
            json!({ "name": "Kai - 03.mkv", "size": 300, "file_id": 3 }),
        ];

        let first = records[0].to_candidate();
        assert_eq!(first.name, "/Kai/Kai - 01.mkv");
        assert_eq!(first.size_bytes, 100);
        assert_eq!(first.provider_file_id.as_deref(), Some("1"));

        let selection =
            select_best_file(&records, &EpisodeTarget::new(2), &SelectOptions::default()).unwrap();
        assert_eq!(selection.index, 1);
        assert_eq!(selection.file.provider_file_id.as_deref(), Some("b"));

        let third = records[2].to_candidate();
        assert_eq!(third.provider_file_id.as_deref(), Some("3"));
    }

    #[test]
    fn test_json_record_without_name() {
        let record = json!({ "size": 5 });
        let candidate = record.to_candidate();
        assert!(candidate.name.is_empty());
        assert!(!candidate.is_usable());
    }

    #[test]
    fn test_largest_video_file_ties() {
        let files = vec![
            CandidateFile::new("a.mkv", 5),
            CandidateFile::new("b.mkv", 5),
            CandidateFile::new("c.txt", 50),
        ];
        assert_eq!(largest_video_file(&files), Some(0));
        assert_eq!(largest_video_file(&[]), None);
    }

    #[test]
    fn test_episode_zero_selects_nothing() {
        let files = vec![
            CandidateFile::new("Kai - 05 - Le Duel [AAC 2.0].mkv", 700),
            CandidateFile::new("Kai - 06 - Suite [AAC 2.0].mkv", 700),
        ];
        assert!(select_best_file(&files, &EpisodeTarget::new(0), &SelectOptions::default()).is_none());
    }
}
