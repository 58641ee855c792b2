//! Read-only presentation over the persisted artifacts.
//!
//! A secondary, non-authoritative consumer: it re-merges "today vs the
//! previous file" for display and must tolerate an absent or empty history,
//! an absent snapshot directory, a single day's snapshot, and legacy column
//! names in older files. It never writes.

use std::path::Path;

use anyhow::Result;

use crate::delta::compute_track_deltas;
use crate::history::{self, SnapshotFile};
use crate::model::{TotalHistoryEntry, TrackRecord};

/// Track table sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSort {
    TotalPlays,
    DailyChange,
}

/// One display row of the track table.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub rank: usize,
    pub record: TrackRecord,
    pub daily_change: i64,
}

/// Load the total-history series sorted by date (physical order in the file
/// is not trusted).
pub fn load_totals_sorted(path: &Path) -> Result<Vec<TotalHistoryEntry>> {
    let mut entries = history::load_total_history(path)?;
    entries.sort_by_key(|e| e.date);
    Ok(entries)
}

/// The newest and second-newest snapshot files, preferring deduplicated
/// variants and falling back to raw files when no deduplicated ones exist.
/// With only one day present there is no previous file to compare against.
pub fn latest_pair(dir: &Path) -> Result<(Option<SnapshotFile>, Option<SnapshotFile>)> {
    let snapshots = history::list_snapshots(dir)?;
    let deduped: Vec<SnapshotFile> = snapshots.iter().filter(|s| s.deduped).cloned().collect();
    let pool = if deduped.is_empty() {
        snapshots.into_iter().filter(|s| !s.deduped).collect()
    } else {
        deduped
    };

    let today = pool.last().cloned();
    let previous = if pool.len() >= 2 { pool.get(pool.len() - 2).cloned() } else { None };
    Ok((today, previous))
}

/// Merge today's listing against the previous file by dedupe key, then sort
/// and rank for display. No previous file means no comparison is possible,
/// so every change shows as 0. The authoritative per-track change remains
/// the pipeline's persisted one.
pub fn build_report(
    today: Vec<TrackRecord>,
    previous: Option<Vec<TrackRecord>>,
    sort: ReportSort,
    limit: usize,
) -> Vec<ReportRow> {
    let mut rows: Vec<(TrackRecord, i64)> = match previous {
        None => today.into_iter().map(|r| (r, 0)).collect(),
        Some(prev) => compute_track_deltas(today, &prev)
            .into_iter()
            .map(|td| (td.record, td.daily_change))
            .collect(),
    };

    match sort {
        ReportSort::TotalPlays => rows.sort_by(|(a, _), (b, _)| {
            b.plays.cmp(&a.plays).then_with(|| a.title.cmp(&b.title))
        }),
        ReportSort::DailyChange => rows.sort_by(|(a, da), (b, db)| {
            db.cmp(da)
                .then_with(|| b.plays.cmp(&a.plays))
                .then_with(|| a.title.cmp(&b.title))
        }),
    }
    if limit > 0 {
        rows.truncate(limit);
    }

    rows.into_iter()
        .enumerate()
        .map(|(i, (record, daily_change))| ReportRow { rank: i + 1, record, daily_change })
        .collect()
}

/// Format a count with thousands separators (1234567 → "1,234,567").
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Signed variant with an explicit plus for gains.
pub fn format_signed(n: i64) -> String {
    if n < 0 {
        format!("-{}", format_count(n.unsigned_abs()))
    } else {
        format!("+{}", format_count(n as u64))
    }
}
