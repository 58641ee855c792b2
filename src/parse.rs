//! Numeric cell parsing: human-formatted play counts and track durations.

use std::sync::LazyLock;

use regex::Regex;

// "1.2k", "3405112", "17 m" — digits/dots with an optional magnitude suffix
static HUMAN_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\d.]+)\s*([kmb])?$").unwrap());

/// Parse a human-formatted play count like `"1.2k"`, `"3,405,112"` or `"17"`.
///
/// Strips thousands separators, applies a case-insensitive k/m/b magnitude
/// suffix (×1e3/1e6/1e9, rounded to the nearest integer), and falls back to a
/// pure-digit parse. Returns `None` for anything else — never 0, since a
/// silently zeroed row would corrupt the daily total.
pub fn parse_human_number(s: &str) -> Option<u64> {
    let s = s.trim().to_lowercase().replace(',', "");
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = HUMAN_NUMBER_RE.captures(&s) {
        let value: f64 = caps.get(1).unwrap().as_str().parse().ok()?;
        let mult = match caps.get(2).map(|m| m.as_str()) {
            Some("k") => 1_000.0,
            Some("m") => 1_000_000.0,
            Some("b") => 1_000_000_000.0,
            _ => 1.0,
        };
        let scaled = (value * mult).round();
        if !scaled.is_finite() || scaled < 0.0 || scaled > u64::MAX as f64 {
            return None;
        }
        return Some(scaled as u64);
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }
    None
}

/// Parse a duration cell: `"MM:SS"`, `"H:MM:SS"`, or bare seconds text.
pub fn parse_duration_secs(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains(':') {
        let mut secs: u64 = 0;
        for part in s.split(':') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            secs = secs * 60 + part.parse::<u64>().ok()?;
        }
        return u32::try_from(secs).ok();
    }
    s.parse().ok()
}
