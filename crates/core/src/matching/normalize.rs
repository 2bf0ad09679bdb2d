use unicode_normalization::UnicodeNormalization;

/// Canonicalize text for comparison: lower-case, canonical decomposition,
/// then drop combining diacritical marks (U+0300..=U+036F).
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_diacritic(*c))
        .collect()
}

fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}
