//! Stats table discovery and row extraction.
//!
//! Schema normalization happens once, here: downstream stages only ever see
//! strongly-typed [`TrackRecord`]s, never raw column-name ambiguity.

use std::sync::LazyLock;

use log::debug;
use scraper::{ElementRef, Html, Selector};

use crate::model::TrackRecord;
use crate::parse::parse_human_number;

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static HEADER_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());
static IMG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

/// Cover image attributes, checked in priority order: direct source first,
/// then the lazy-load alternatives the source uses for deferred images.
const IMG_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];

/// Column indices resolved from a table's header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub title: usize,
    pub plays: usize,
    pub duration: usize,
    pub release_date: usize,
    pub isrc: Option<usize>,
}

/// A located stats table plus its resolved column schema.
pub struct StatsTable<'a> {
    table: ElementRef<'a>,
    pub columns: ColumnMap,
}

/// Scan all tables in document order and return the first whose lower-cased
/// header set covers title, plays, duration, and release date.
///
/// `None` is a distinct, non-exceptional outcome: it is what a source page
/// redesign looks like, and callers abort gracefully instead of crashing.
pub fn locate_stats_table(document: &Html) -> Option<StatsTable<'_>> {
    for table in document.select(&TABLE_SEL) {
        let headers: Vec<String> = table
            .select(&HEADER_SEL)
            .map(|th| cell_text(th).to_lowercase())
            .collect();
        if headers.is_empty() {
            continue;
        }
        if let Some(columns) = resolve_columns(&headers) {
            return Some(StatsTable { table, columns });
        }
    }
    None
}

/// Map header names to column roles. First matching header wins per role;
/// the table qualifies only when every required role is present.
fn resolve_columns(headers: &[String]) -> Option<ColumnMap> {
    let mut title = None;
    let mut plays = None;
    let mut duration = None;
    let mut release_date = None;
    let mut isrc = None;

    for (i, name) in headers.iter().enumerate() {
        if ["track", "title", "song"].iter().any(|k| name.contains(k)) {
            title.get_or_insert(i);
        }
        if name.contains("play") || name.contains("stream") {
            plays.get_or_insert(i);
        }
        if name.contains("duration") || name.contains("length") {
            duration.get_or_insert(i);
        }
        if name.contains("release date") || name == "date" {
            release_date.get_or_insert(i);
        }
        if name.contains("isrc") {
            isrc.get_or_insert(i);
        }
    }

    Some(ColumnMap {
        title: title?,
        plays: plays?,
        duration: duration?,
        release_date: release_date?,
        isrc,
    })
}

impl StatsTable<'_> {
    /// Convert data rows into raw track records.
    ///
    /// Rows with fewer cells than headers are skipped (malformed row guard).
    /// Rows with an empty title or an unparseable play count are dropped,
    /// never coerced to zero — a silent zero would corrupt the total. The
    /// header row eliminates itself the same way.
    pub fn extract_rows(&self) -> Vec<TrackRecord> {
        let header_count = self.table.select(&HEADER_SEL).count();
        let mut records = Vec::new();

        for row in self.table.select(&ROW_SEL) {
            let cells: Vec<ElementRef<'_>> = row.select(&CELL_SEL).collect();
            if cells.is_empty() || cells.len() < header_count {
                continue;
            }
            let text_at = |idx: usize| cells.get(idx).map(|c| cell_text(*c)).unwrap_or_default();

            let title = text_at(self.columns.title);
            if title.is_empty() {
                debug!("dropping row with empty title");
                continue;
            }
            let plays = match parse_human_number(&text_at(self.columns.plays)) {
                Some(p) => p,
                None => {
                    debug!("dropping row with unparseable plays (title: {title:?})");
                    continue;
                }
            };

            records.push(TrackRecord {
                title,
                plays,
                duration: non_empty(text_at(self.columns.duration)),
                release_date: non_empty(text_at(self.columns.release_date)),
                isrc: self.columns.isrc.map(text_at).and_then(non_empty),
                cover_url: extract_cover_url(row),
            });
        }

        records
    }
}

/// First usable image URL in the row, protocol-relative URLs resolved to
/// absolute.
fn extract_cover_url(row: ElementRef<'_>) -> Option<String> {
    let img = row.select(&IMG_SEL).next()?;
    for attr in IMG_ATTRS {
        if let Some(src) = img.value().attr(attr) {
            let src = src.trim();
            if !src.is_empty() {
                return Some(absolutize(src));
            }
        }
    }
    None
}

fn absolutize(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Element text with embedded whitespace normalized to single spaces.
fn cell_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
