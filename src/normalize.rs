//! Title canonicalization and the configured exclusion list.
//!
//! Exclusion runs before raw persistence, deduplication, and total
//! computation, so an excluded track never contributes to any artifact.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Unicode combining marks (diacritics) dropped during normalization.
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Canonicalize a track title for keying and matching.
///
/// Pure and deterministic: lowercase, NFKD decomposition with combining
/// marks removed, internal whitespace runs collapsed to one space, ends
/// trimmed. Idempotent: `normalize_title(normalize_title(x)) ==
/// normalize_title(x)`.
pub fn normalize_title(title: &str) -> String {
    let stripped: String = title
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    MULTI_SPACE_RE.replace_all(stripped.trim(), " ").to_string()
}

/// Configured title exclusion rules, compiled once per run.
///
/// `words` match as word-boundary literals inside the normalized title;
/// `phrases` must equal the whole normalized title. Used for misattributed
/// tracks and unwanted remaster editions.
#[derive(Debug, Default)]
pub struct ExclusionList {
    word_rules: Vec<Regex>,
    phrases: Vec<String>,
}

impl ExclusionList {
    pub fn new(words: &[String], phrases: &[String]) -> Self {
        let word_rules = words
            .iter()
            .map(|w| normalize_title(w))
            .filter(|w| !w.is_empty())
            .map(|w| {
                // Escaped literal inside \b..\b is always a valid pattern.
                Regex::new(&format!(r"\b{}\b", regex::escape(&w))).unwrap()
            })
            .collect();
        let phrases = phrases
            .iter()
            .map(|p| normalize_title(p))
            .filter(|p| !p.is_empty())
            .collect();
        Self { word_rules, phrases }
    }

    pub fn is_empty(&self) -> bool {
        self.word_rules.is_empty() && self.phrases.is_empty()
    }

    /// Evaluate a raw title against the rules (normalized internally).
    pub fn is_excluded(&self, title: &str) -> bool {
        let norm = normalize_title(title);
        self.phrases.iter().any(|p| *p == norm)
            || self.word_rules.iter().any(|re| re.is_match(&norm))
    }
}
