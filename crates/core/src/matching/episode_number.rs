use regex_lite::Regex;

/// Tolerant episode-number recognizer for release file names.
///
/// Every form requires a word boundary or a separator around the number, so
/// `12` never matches inside `123`. All forms are case-insensitive.
/// Episode 0 matches nothing.
#[derive(Debug, Clone)]
pub struct EpisodeNumberMatcher {
    number: u32,
    patterns: Vec<Regex>,
}

impl EpisodeNumberMatcher {
    pub fn new(number: u32) -> Self {
        if number == 0 {
            return Self {
                number,
                patterns: Vec::new(),
            };
        }
        let n = number;
        let sources = [
            format!(r"\b{n}\b"),
            format!(r"\b0*{n}\b"),
            format!(r"\bE0*{n}\b"),
            format!(r"\bEP0*{n}\b"),
            format!(r"\bEpisode\s*0*{n}\b"),
            format!(r"\b#0*{n}\b"),
            format!(r"\bFilm\s*0*{n}\b"),
            format!(r"\b0*{n}[\s_.-]"),
            format!(r"[\s_.-]0*{n}\b"),
            format!(r"S\d+E0*{n}\b"),
            format!(r"\[0*{n}\]"),
        ];

        let patterns = sources
            .iter()
            .filter_map(|src| Regex::new(&format!("(?i){}", src)).ok())
            .collect();

        Self { number, patterns }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Whether `name` carries this episode number in any recognized form.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(number: u32, name: &str) -> bool {
        EpisodeNumberMatcher::new(number).matches(name)
    }

    #[test]
    fn test_bare_and_padded_numbers() {
        assert!(matches(5, "Show - 5.mkv"));
        assert!(matches(5, "Show - 05.mkv"));
        assert!(matches(5, "Show - 005 - Title.mkv"));
    }

    #[test]
    fn test_prefixed_forms() {
        assert!(matches(7, "Show E07.mkv"));
        assert!(matches(7, "Show ep7.mkv"));
        assert!(matches(7, "Show EP07.mkv"));
        assert!(matches(7, "Show Episode 7.mkv"));
        assert!(matches(7, "Show episode07.mkv"));
        assert!(matches(2, "One Piece Film 2.mkv"));
    }

    #[test]
    fn test_separator_and_bracket_forms() {
        assert!(matches(3, "Show_03.mkv"));
        assert!(matches(3, "Show-03 VOSTFR.mkv"));
        assert!(matches(3, "Show.03.mkv"));
        assert!(matches(3, "[Group] Show [03].mkv"));
        assert!(matches(11, "Show.S02E11.1080p.mkv"));
        assert!(matches(7, "show.s01e07.mp4"));
    }

    #[test]
    fn test_number_is_not_a_substring_match() {
        assert!(!matches(12, "Show - 123.mkv"));
        assert!(!matches(7, "Show - 17.mkv"));
        assert!(!matches(1, "Show - 10.mkv"));
        assert!(!matches(80, "Show 1080p.mkv"));
    }

    #[test]
    fn test_episode_zero_never_matches() {
        assert!(!matches(0, "Kai - 05 - Le Duel [AAC 2.0].mkv"));
        assert!(!matches(0, "Kai - 00.mkv"));
        assert!(!matches(0, "Kai 5.1.mkv"));
    }

    #[test]
    fn test_number_accessor() {
        assert_eq!(EpisodeNumberMatcher::new(42).number(), 42);
    }
}
