use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One observed track on one day. The title is kept as scraped (display
/// form); keying and matching go through the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub plays: u64,
    pub duration: Option<String>,
    pub release_date: Option<String>,
    pub isrc: Option<String>,
    pub cover_url: Option<String>,
}

/// A deduplicated track joined against the previous day's snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDelta {
    pub record: TrackRecord,
    /// Plays today minus plays under the same dedupe key in the previous
    /// snapshot. A key with no previous match contributes its full count.
    pub daily_change: i64,
}

/// One row of the total-history time series. At most one entry exists per
/// date; physical row order is not guaranteed to be chronological.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalHistoryEntry {
    pub date: NaiveDate,
    pub total_plays: u64,
    pub daily_delta: i64,
    pub source: String,
}

/// CSV row shape for the deduplicated snapshot artifact: a 1-based display
/// rank leads, the daily change follows the play count, and the rest is the
/// raw column set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupedRow {
    pub rank: u32,
    pub title: String,
    pub plays: u64,
    pub daily_change: i64,
    pub duration: Option<String>,
    pub release_date: Option<String>,
    pub isrc: Option<String>,
    pub cover_url: Option<String>,
}
