//! Day-over-day comparison against the previous persisted snapshot.

use std::collections::HashMap;

use crate::dedupe::dedupe_key;
use crate::model::{TrackDelta, TrackRecord};

/// Join today's deduplicated snapshot against the previous one by dedupe key
/// and fill per-track daily changes.
///
/// Left join with today as the base: a key with no previous match (brand-new
/// release, or no previous snapshot at all) reads the previous count as 0,
/// so its change equals today's full play count. The rule is applied
/// uniformly across all records.
pub fn compute_track_deltas(today: Vec<TrackRecord>, previous: &[TrackRecord]) -> Vec<TrackDelta> {
    let mut prev_plays: HashMap<String, u64> = HashMap::new();
    for record in previous {
        // Previous files are deduplicated already; keep the max defensively.
        let entry = prev_plays.entry(dedupe_key(record)).or_insert(0);
        *entry = (*entry).max(record.plays);
    }

    today
        .into_iter()
        .map(|record| {
            let before = prev_plays.get(&dedupe_key(&record)).copied().unwrap_or(0);
            let daily_change = record.plays as i64 - before as i64;
            TrackDelta { record, daily_change }
        })
        .collect()
}

/// Aggregate delta against the last persisted total; no earlier total ⇒ 0.
pub fn compute_total_delta(total: u64, previous_total: Option<u64>) -> i64 {
    match previous_total {
        Some(prev) => total as i64 - prev as i64,
        None => 0,
    }
}
