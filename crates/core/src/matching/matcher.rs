//! Layered episode matcher.
//!
//! Order of evaluation, first success wins:
//! 1. keep only files carrying the episode number
//! 2. without a title, take the first of those
//! 3. exact title containment (raw, then normalized)
//! 4. fuzzy title match (au/aux, articles stripped, word overlap)
//! 5. largest numbered file

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;

use super::episode_number::EpisodeNumberMatcher;
use super::normalize::normalize;
use super::types::{CandidateFile, EpisodeTarget};

/// Minimum share of significant title words found in the file name.
const WORD_OVERLAP_THRESHOLD: f64 = 0.7;

/// Short words ignored by the word-overlap rule.
const STOP_WORDS: &[&str] = &["de", "du", "des", "et", "a", "à", "le", "la", "les", "un", "une"];

static ARTICLES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\ble\s|\bla\s|\bles\s|\bl'").unwrap());

/// Select the best file for `target`, or `None` when nothing carries the
/// episode number.
pub fn select_episode<'a>(
    files: &'a [CandidateFile],
    target: &EpisodeTarget,
) -> Option<&'a CandidateFile> {
    select_episode_position(files, target).map(|i| &files[i])
}

/// Same as [`select_episode`] but returns the position in `files`.
pub fn select_episode_position(files: &[CandidateFile], target: &EpisodeTarget) -> Option<usize> {
    let numbered = numbered_positions(files, target.number);
    if numbered.is_empty() {
        debug!(episode = target.number, files = files.len(), "No file carries the episode number");
        return None;
    }

    let title = match significant_title(target) {
        Some(title) => title,
        None => return numbered.first().copied(),
    };

    if let Some(pos) = title_match(files, &numbered, title) {
        return Some(pos);
    }

    let pos = largest_position(files, numbered.iter().copied());
    if let Some(pos) = pos {
        debug!(
            episode = target.number,
            title = %title,
            file = %files[pos].name,
            "No title match, falling back to largest numbered file"
        );
    }
    pos
}

/// Find a file matching both the episode number and the title, without the
/// size fallback. Targets without a title never match.
pub fn match_by_title<'a>(
    files: &'a [CandidateFile],
    target: &EpisodeTarget,
) -> Option<&'a CandidateFile> {
    let title = significant_title(target)?;
    let numbered = numbered_positions(files, target.number);
    title_match(files, &numbered, title).map(|i| &files[i])
}

/// Membership test used to qualify a whole torrent.
pub fn contains_episode(files: &[CandidateFile], target: &EpisodeTarget) -> bool {
    match_by_title(files, target).is_some()
}

fn significant_title(target: &EpisodeTarget) -> Option<&str> {
    target.title().filter(|t| !t.trim().is_empty())
}

fn numbered_positions(files: &[CandidateFile], number: u32) -> Vec<usize> {
    let matcher = EpisodeNumberMatcher::new(number);
    files
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_usable() && matcher.matches(&f.name))
        .map(|(i, _)| i)
        .collect()
}

fn title_match(files: &[CandidateFile], positions: &[usize], title: &str) -> Option<usize> {
    let wanted = normalize(title);

    let exact = positions.iter().copied().find(|&i| {
        let name = &files[i].name;
        name.contains(title) || normalize(name).contains(&wanted)
    });
    if exact.is_some() {
        return exact;
    }

    positions.iter().copied().find(|&i| {
        let name = normalize(&files[i].name);
        if plural_variant_matches(&name, &wanted) {
            debug!(file = %files[i].name, "Matched on au/aux variant");
            return true;
        }
        if article_stripped_matches(&name, &wanted) {
            debug!(file = %files[i].name, "Matched without articles");
            return true;
        }
        if words_overlap(&name, &wanted) {
            debug!(file = %files[i].name, "Matched on word overlap");
            return true;
        }
        false
    })
}

/// French singular/plural "au"/"aux" swap. Inputs are normalized.
fn plural_variant_matches(name: &str, title: &str) -> bool {
    (title.contains(" au ") && name.contains(&title.replacen(" au ", " aux ", 1)))
        || (title.contains(" aux ") && name.contains(&title.replacen(" aux ", " au ", 1)))
}

/// Containment after removing le/la/les/l' from both sides.
fn article_stripped_matches(name: &str, title: &str) -> bool {
    let name = ARTICLES.replace_all(name, "");
    let title = ARTICLES.replace_all(title, "");
    name.contains(title.as_ref())
}

fn words_overlap(name: &str, title: &str) -> bool {
    let name_words: Vec<&str> = name.split_whitespace().collect();
    let significant: Vec<&str> = title
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .collect();

    if significant.is_empty() {
        return false;
    }

    let matched = significant
        .iter()
        .filter(|w| name_words.iter().any(|n| words_match(n, w)))
        .count();

    matched as f64 / significant.len() as f64 >= WORD_OVERLAP_THRESHOLD
}

fn words_match(a: &str, b: &str) -> bool {
    a == b || (a.chars().count() > 3 && b.chars().count() > 3 && (a.contains(b) || b.contains(a)))
}

/// Largest file by size among `positions`; ties go to the earliest.
pub(super) fn largest_position(
    files: &[CandidateFile],
    positions: impl IntoIterator<Item = usize>,
) -> Option<usize> {
    let mut best: Option<usize> = None;
    for i in positions {
        match best {
            Some(b) if files[i].size_bytes <= files[b].size_bytes => {}
            _ => best = Some(i),
        }
    }
    best
}
