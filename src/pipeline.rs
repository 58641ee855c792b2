//! The scrape-and-reconcile pipeline: one invocation equals one "today"
//! snapshot.
//!
//! Single-threaded, synchronous, run-to-completion. Every read and every
//! computation happens before the first artifact write, and the
//! total-history upsert is the very last step — a terminal failure anywhere
//! earlier leaves the history record untouched. The parsed document and
//! loaded history live only for this one run; nothing is cached across runs.

use std::path::PathBuf;

use chrono::NaiveDate;
use log::{debug, info};
use scraper::Html;

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::model::{TotalHistoryEntry, TrackRecord};
use crate::normalize::ExclusionList;
use crate::{dedupe, delta, fetch, history, page};

/// Counters and outputs from one pipeline run.
#[derive(Debug)]
pub struct RunSummary {
    pub date: NaiveDate,
    /// Rows successfully extracted from the table, before filtering.
    pub raw_rows: usize,
    /// Rows removed by the exclusion list.
    pub excluded: usize,
    /// Deduplicated tracks persisted for the day.
    pub tracks: usize,
    pub total_plays: u64,
    pub daily_delta: i64,
    pub raw_path: PathBuf,
    pub deduped_path: PathBuf,
    pub total_path: PathBuf,
}

/// Fetch the artist page and reconcile today's snapshot into the artifacts.
pub fn run(config: &AppConfig, date: NaiveDate) -> Result<RunSummary, PipelineError> {
    let agent = fetch::build_agent(&config.fetch);
    let markup = fetch::fetch_page(&agent, &config.artist_url, &config.fetch)?;
    run_with_markup(&markup, config, date)
}

/// Reconcile already-fetched markup into the artifacts for `date`.
pub fn run_with_markup(
    markup: &str,
    config: &AppConfig,
    date: NaiveDate,
) -> Result<RunSummary, PipelineError> {
    let document = Html::parse_document(markup);
    let table = page::locate_stats_table(&document).ok_or(PipelineError::TableNotFound)?;
    let rows = table.extract_rows();
    if rows.is_empty() {
        // A matching table that yields zero parseable rows is the same
        // signal as a redesigned page.
        return Err(PipelineError::TableNotFound);
    }
    let raw_rows = rows.len();

    // Exclusion runs before raw persistence, dedup, and totals.
    let exclusions = ExclusionList::new(&config.exclusions.words, &config.exclusions.phrases);
    let kept: Vec<TrackRecord> = rows
        .into_iter()
        .filter(|r| {
            let excluded = exclusions.is_excluded(&r.title);
            if excluded {
                debug!("excluding {:?}", r.title);
            }
            !excluded
        })
        .collect();
    let excluded = raw_rows - kept.len();

    let data_dir = config.resolve_data_dir();
    let snap_dir = history::snapshot_dir(&data_dir);
    let total_path = history::total_history_path(&data_dir);

    // All reads happen up front, so a failure here mutates nothing.
    let baseline = history::latest_snapshot_before(&snap_dir, date).map_err(PipelineError::Persist)?;
    let previous_records = match &baseline {
        Some(snapshot) => history::load_snapshot(&snapshot.path).map_err(PipelineError::Persist)?,
        None => Vec::new(),
    };
    let entries = history::load_total_history(&total_path).map_err(PipelineError::Persist)?;

    let deduped = dedupe::dedupe(kept.clone());
    let with_deltas = delta::compute_track_deltas(deduped, &previous_records);
    let total_plays: u64 = with_deltas.iter().map(|t| t.record.plays).sum();
    let daily_delta =
        delta::compute_total_delta(total_plays, history::latest_total_before(&entries, date));

    let (raw_path, deduped_path) =
        history::write_daily_snapshot(&snap_dir, date, &kept, &with_deltas)
            .map_err(PipelineError::Persist)?;
    let entry = TotalHistoryEntry {
        date,
        total_plays,
        daily_delta,
        source: config.source_label.clone(),
    };
    history::upsert_total(&total_path, entry).map_err(PipelineError::Persist)?;

    info!(
        "recorded {} plays across {} tracks for {date}",
        total_plays,
        with_deltas.len()
    );
    Ok(RunSummary {
        date,
        raw_rows,
        excluded,
        tracks: with_deltas.len(),
        total_plays,
        daily_delta,
        raw_path,
        deduped_path,
        total_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ExclusionConfig};
    use std::fs;
    use tempfile::tempdir;

    fn page_html(rows: &[(&str, &str, &str)]) -> String {
        let mut body = String::from(
            "<table><thead><tr>\
             <th>Track</th><th>Plays</th><th>Duration</th><th>Release date</th>\
             </tr></thead><tbody>",
        );
        for (title, plays, duration) in rows {
            body.push_str(&format!(
                "<tr><td>{title}</td><td>{plays}</td><td>{duration}</td><td>2001</td></tr>"
            ));
        }
        body.push_str("</tbody></table>");
        body
    }

    fn test_config(data_dir: &std::path::Path) -> AppConfig {
        AppConfig {
            data_dir: Some(data_dir.to_path_buf()),
            exclusions: ExclusionConfig {
                words: vec!["Mouri".to_string()],
                phrases: Vec::new(),
            },
            ..AppConfig::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_end_to_end_dedup_and_exclusion() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let markup = page_html(&[
            ("Kalimera Helada", "500", "3:20"),
            ("Kalimera Helada", "520", "3:20"),
            ("Mouri", "9999", "2:10"),
        ]);

        let summary = run_with_markup(&markup, &config, date("2025-08-24")).unwrap();

        assert_eq!(summary.raw_rows, 3);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.tracks, 1);
        // Excluded row contributes nothing; dedup keeps the max reading.
        assert_eq!(summary.total_plays, 520);
        assert_eq!(summary.daily_delta, 0); // first-ever day

        // Raw file keeps both duplicate rows, excluded row already gone.
        let raw = history::load_snapshot(&summary.raw_path).unwrap();
        assert_eq!(raw.len(), 2);
        assert!(raw.iter().all(|r| r.title == "Kalimera Helada"));

        let deduped = history::load_snapshot(&summary.deduped_path).unwrap();
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].plays, 520);

        // First-day per-track change equals the full play count.
        let contents = fs::read_to_string(&summary.deduped_path).unwrap();
        assert!(contents.contains("1,Kalimera Helada,520,520"));
    }

    #[test]
    fn test_second_day_deltas() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        let day1 = page_html(&[("Kalimera Helada", "1000", "3:20")]);
        run_with_markup(&day1, &config, date("2025-08-24")).unwrap();

        let day2 = page_html(&[
            ("Kalimera Helada", "1040", "3:20"),
            ("Nea Kykloforia", "10", "3:05"),
        ]);
        let summary = run_with_markup(&day2, &config, date("2025-08-25")).unwrap();

        assert_eq!(summary.total_plays, 1_050);
        assert_eq!(summary.daily_delta, 50);

        let contents = fs::read_to_string(&summary.deduped_path).unwrap();
        // Matched key: 1040 - 1000; new key: full count.
        assert!(contents.contains("1,Kalimera Helada,1040,40"));
        assert!(contents.contains("2,Nea Kykloforia,10,10"));
    }

    #[test]
    fn test_same_day_rerun_is_idempotent() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());

        run_with_markup(&page_html(&[("A", "900", "3:00")]), &config, date("2025-08-24")).unwrap();
        run_with_markup(&page_html(&[("A", "1000", "3:00")]), &config, date("2025-08-25")).unwrap();
        let rerun =
            run_with_markup(&page_html(&[("A", "1005", "3:00")]), &config, date("2025-08-25"))
                .unwrap();

        // Delta is still computed against the previous *day*, not the row
        // being replaced.
        assert_eq!(rerun.daily_delta, 105);

        let entries = history::load_total_history(&rerun.total_path).unwrap();
        assert_eq!(entries.len(), 2);
        let today: Vec<_> = entries.iter().filter(|e| e.date == date("2025-08-25")).collect();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].total_plays, 1_005);
    }

    #[test]
    fn test_redesigned_page_is_table_not_found() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let err = run_with_markup("<html><p>moved</p></html>", &config, date("2025-08-25"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::TableNotFound));

        // Terminal failure before any artifact mutation.
        assert!(!history::total_history_path(dir.path()).exists());
        assert!(!history::snapshot_dir(dir.path()).exists());
    }

    #[test]
    fn test_table_with_no_parseable_rows_aborts() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let markup = page_html(&[("Only Bad Rows", "n/a", "3:00")]);
        let err = run_with_markup(&markup, &config, date("2025-08-25")).unwrap_err();
        assert!(matches!(err, PipelineError::TableNotFound));
        assert!(!history::total_history_path(dir.path()).exists());
    }
}
