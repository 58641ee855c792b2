//! Durable artifacts: the total-history CSV and the per-day snapshot files.
//!
//! The pipeline is the sole writer. Every write goes through a temporary
//! sibling path and an atomic rename, so a concurrent reader (or the upsert
//! scan itself) never observes a half-written file. Snapshot files for past
//! dates are never mutated; the total-history record is mutated only via the
//! date-keyed upsert.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::debug;
use regex::Regex;

use crate::model::{DedupedRow, TotalHistoryEntry, TrackDelta, TrackRecord};
use crate::parse::parse_human_number;

pub const TOTAL_HISTORY_FILE: &str = "total_streams.csv";
pub const SNAPSHOT_DIR: &str = "tracks";

// track_streams_2025-08-25.csv / track_streams_2025-08-25_deduped.csv
static SNAPSHOT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^track_streams_(\d{4}-\d{2}-\d{2})(_deduped)?\.csv$").unwrap()
});

pub fn total_history_path(data_dir: &Path) -> PathBuf {
    data_dir.join(TOTAL_HISTORY_FILE)
}

pub fn snapshot_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(SNAPSHOT_DIR)
}

/// Snapshot filenames embed the date so lexical filename order equals
/// chronological order.
pub fn snapshot_path(dir: &Path, date: NaiveDate, deduped: bool) -> PathBuf {
    let suffix = if deduped { "_deduped" } else { "" };
    dir.join(format!("track_streams_{date}{suffix}.csv"))
}

/// One snapshot file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub date: NaiveDate,
    pub deduped: bool,
    pub path: PathBuf,
}

/// Load the total-history series in physical row order.
///
/// Tolerates a missing file (empty history), a BOM on the first cell, stray
/// header rows anywhere in the file, and rows whose date or total does not
/// parse (skipped with a debug log). Physical order may differ from
/// chronological order; callers sort or scan by date.
pub fn load_total_history(path: &Path) -> Result<Vec<TotalHistoryEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read {}", path.display()))?;
        let date = record
            .get(0)
            .map(clean_cell)
            .and_then(|d| d.parse::<NaiveDate>().ok());
        let Some(date) = date else {
            debug!("skipping non-data row in {}", path.display());
            continue;
        };
        let total_plays = record.get(1).and_then(|v| v.trim().parse::<u64>().ok());
        let Some(total_plays) = total_plays else {
            debug!("skipping row with bad total for {date} in {}", path.display());
            continue;
        };
        let daily_delta = record
            .get(2)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let source = record.get(3).unwrap_or("").trim().to_string();
        entries.push(TotalHistoryEntry { date, total_plays, daily_delta, source });
    }
    Ok(entries)
}

/// Total from the most recent entry dated strictly before `date`. Rows may
/// be physically out of order, so this scans by date, not position — the
/// delta baseline stays stable across same-day reruns.
pub fn latest_total_before(entries: &[TotalHistoryEntry], date: NaiveDate) -> Option<u64> {
    entries
        .iter()
        .filter(|e| e.date < date)
        .max_by_key(|e| e.date)
        .map(|e| e.total_plays)
}

/// Insert-or-replace the entry for its date, then rewrite atomically.
///
/// Scans from the most recent end (same-day reruns are the common case):
/// running the pipeline N times on one date leaves exactly one row for that
/// date, reflecting the Nth run's values. Physical order of the other rows
/// is preserved; consumers sort by date.
pub fn upsert_total(path: &Path, entry: TotalHistoryEntry) -> Result<()> {
    let mut entries = load_total_history(path)?;
    match entries.iter().rposition(|e| e.date == entry.date) {
        Some(idx) => entries[idx] = entry,
        None => entries.push(entry),
    }
    write_total_history(path, &entries)
}

fn write_total_history(path: &Path, entries: &[TotalHistoryEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in entries {
        writer
            .serialize(entry)
            .with_context(|| format!("failed to encode row for {}", entry.date))?;
    }
    let bytes = writer.into_inner().context("failed to flush csv buffer")?;
    atomic_write(path, &bytes)
}

/// Persist the raw (post-exclusion) and deduplicated listings for `date`,
/// returning the two paths. Each file is written in one pass through a temp
/// path; a file for a past date is never touched again.
pub fn write_daily_snapshot(
    dir: &Path,
    date: NaiveDate,
    raw: &[TrackRecord],
    deduped: &[TrackDelta],
) -> Result<(PathBuf, PathBuf)> {
    let raw_path = snapshot_path(dir, date, false);
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in raw {
        writer
            .serialize(record)
            .with_context(|| format!("failed to encode {:?}", record.title))?;
    }
    let bytes = writer.into_inner().context("failed to flush csv buffer")?;
    atomic_write(&raw_path, &bytes)?;

    // Deduplicated variant: ranked by plays (title as tiebreak) for display.
    let mut ranked: Vec<&TrackDelta> = deduped.iter().collect();
    ranked.sort_by(|a, b| {
        b.record
            .plays
            .cmp(&a.record.plays)
            .then_with(|| a.record.title.cmp(&b.record.title))
    });

    let deduped_path = snapshot_path(dir, date, true);
    let mut writer = csv::Writer::from_writer(Vec::new());
    for (i, td) in ranked.iter().enumerate() {
        let row = DedupedRow {
            rank: (i + 1) as u32,
            title: td.record.title.clone(),
            plays: td.record.plays,
            daily_change: td.daily_change,
            duration: td.record.duration.clone(),
            release_date: td.record.release_date.clone(),
            isrc: td.record.isrc.clone(),
            cover_url: td.record.cover_url.clone(),
        };
        writer
            .serialize(row)
            .with_context(|| format!("failed to encode {:?}", td.record.title))?;
    }
    let bytes = writer.into_inner().context("failed to flush csv buffer")?;
    atomic_write(&deduped_path, &bytes)?;

    Ok((raw_path, deduped_path))
}

/// Read a snapshot file back into track records.
///
/// Columns are resolved by header name, so both snapshot variants load the
/// same way; legacy aliases (`track` for `title`, `total` for `plays`) are
/// accepted. Rows without a usable title and play count are skipped.
pub fn load_snapshot(path: &Path) -> Result<Vec<TrackRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .iter()
        .map(|h| clean_cell(h).to_lowercase())
        .collect();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let Some(title_idx) = col("title").or_else(|| col("track")) else {
        debug!("no title column in {}", path.display());
        return Ok(Vec::new());
    };
    let Some(plays_idx) = col("plays").or_else(|| col("total")) else {
        debug!("no plays column in {}", path.display());
        return Ok(Vec::new());
    };
    let duration_idx = col("duration");
    let release_idx = col("release_date");
    let isrc_idx = col("isrc");
    let cover_idx = col("cover_url");

    let field = |record: &csv::StringRecord, idx: Option<usize>| -> Option<String> {
        let value = idx.and_then(|i| record.get(i)).unwrap_or("").trim();
        if value.is_empty() { None } else { Some(value.to_string()) }
    };

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to read {}", path.display()))?;
        let title = record.get(title_idx).unwrap_or("").trim().to_string();
        if title.is_empty() {
            continue;
        }
        let Some(plays) = record.get(plays_idx).and_then(parse_human_number) else {
            debug!("skipping snapshot row with bad plays (title: {title:?})");
            continue;
        };
        records.push(TrackRecord {
            title,
            plays,
            duration: field(&record, duration_idx),
            release_date: field(&record, release_idx),
            isrc: field(&record, isrc_idx),
            cover_url: field(&record, cover_idx),
        });
    }
    Ok(records)
}

/// List snapshot files in the directory, sorted by date (raw before deduped
/// within a date). A missing directory is an empty list.
pub fn list_snapshots(dir: &Path) -> Result<Vec<SnapshotFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut snapshots = Vec::new();
    for dir_entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let dir_entry = dir_entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let name = dir_entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(caps) = SNAPSHOT_NAME_RE.captures(name) else { continue };
        let Ok(date) = caps[1].parse::<NaiveDate>() else { continue };
        snapshots.push(SnapshotFile {
            date,
            deduped: caps.get(2).is_some(),
            path: dir_entry.path(),
        });
    }
    snapshots.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.deduped.cmp(&b.deduped)));
    Ok(snapshots)
}

/// Most recent deduplicated snapshot dated strictly before `date` — the
/// baseline for the per-track daily change join.
pub fn latest_snapshot_before(dir: &Path, date: NaiveDate) -> Result<Option<SnapshotFile>> {
    let snapshots = list_snapshots(dir)?;
    Ok(snapshots
        .into_iter()
        .filter(|s| s.deduped && s.date < date)
        .max_by_key(|s| s.date))
}

/// Strip a UTF-8 BOM (legacy files) and surrounding whitespace from a cell.
fn clean_cell(cell: &str) -> &str {
    cell.trim_start_matches('\u{feff}').trim()
}

/// Write through a temporary sibling path and rename into place.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, bytes).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}
