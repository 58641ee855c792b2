//! Title-based deduplication.
//!
//! The source occasionally lists one track twice (regional variants,
//! re-uploads). Records sharing a dedupe key are the same underlying track.

use std::collections::HashMap;

use crate::model::TrackRecord;
use crate::normalize::normalize_title;
use crate::parse::parse_duration_secs;

/// Stable identity for "the same track" across duplicate listings:
/// normalized title plus duration in seconds, joined by `|`. The seconds
/// field is left empty when the duration is missing or unparseable.
pub fn dedupe_key(record: &TrackRecord) -> String {
    let title = normalize_title(&record.title);
    match record.duration.as_deref().and_then(parse_duration_secs) {
        Some(secs) => format!("{title}|{secs}"),
        None => format!("{title}|"),
    }
}

/// Collapse duplicate listings to one record per dedupe key.
///
/// Each group keeps the maximum play count observed — the source sometimes
/// under-reports one duplicate row, and the higher reading is treated as
/// closer to ground truth. The representative record (title, duration,
/// release date, cover) is the highest-plays member, first-encountered on
/// ties. Idempotent; output order is first-encounter order and carries no
/// meaning (consumers re-sort for display).
pub fn dedupe(records: Vec<TrackRecord>) -> Vec<TrackRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, TrackRecord> = HashMap::new();

    for record in records {
        let key = dedupe_key(&record);
        match by_key.get_mut(&key) {
            Some(existing) => {
                if record.plays > existing.plays {
                    *existing = record;
                }
            }
            None => {
                order.push(key.clone());
                by_key.insert(key, record);
            }
        }
    }

    order.into_iter().filter_map(|k| by_key.remove(&k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, plays: u64, duration: Option<&str>) -> TrackRecord {
        TrackRecord {
            title: title.to_string(),
            plays,
            duration: duration.map(|d| d.to_string()),
            release_date: None,
            isrc: None,
            cover_url: None,
        }
    }

    #[test]
    fn test_key_accent_and_case_insensitive() {
        let a = track("Kalimera Helada", 100, Some("3:20"));
        let b = track("KALIMÉRA  HELADA", 120, Some("200"));
        assert_eq!(dedupe_key(&a), dedupe_key(&b));
        assert_eq!(dedupe_key(&a), "kalimera helada|200");
    }

    #[test]
    fn test_key_missing_duration() {
        let a = track("Mono Esy", 10, None);
        assert_eq!(dedupe_key(&a), "mono esy|");
        let b = track("Mono Esy", 10, Some("not a time"));
        assert_eq!(dedupe_key(&b), "mono esy|");
    }

    #[test]
    fn test_dedupe_keeps_max_plays() {
        let out = dedupe(vec![
            track("Kalimera Helada", 100, Some("3:20")),
            track("Kalimera Helada", 120, Some("3:20")),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].plays, 120);
    }

    #[test]
    fn test_dedupe_representative_is_highest_plays() {
        let mut low = track("Treno", 50, Some("2:10"));
        low.release_date = Some("2001".to_string());
        let mut high = track("TRENO", 80, Some("2:10"));
        high.release_date = Some("2019".to_string());

        let out = dedupe(vec![low, high]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "TRENO");
        assert_eq!(out[0].release_date.as_deref(), Some("2019"));
    }

    #[test]
    fn test_dedupe_ties_keep_first_encountered() {
        let out = dedupe(vec![
            track("Treno", 80, Some("2:10")),
            track("TRENO", 80, Some("2:10")),
        ]);
        assert_eq!(out[0].title, "Treno");
    }

    #[test]
    fn test_dedupe_idempotent() {
        let once = dedupe(vec![
            track("A", 1, Some("1:00")),
            track("A", 3, Some("1:00")),
            track("B", 2, None),
        ]);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_different_durations_stay_separate() {
        let out = dedupe(vec![
            track("Edit", 10, Some("3:00")),
            track("Edit", 12, Some("4:00")),
        ]);
        assert_eq!(out.len(), 2);
    }
}
