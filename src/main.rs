use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use streamvault::report::{self, format_count, format_signed, ReportRow, ReportSort};
use streamvault::{history, pipeline};

#[derive(Parser)]
#[command(name = "streamvault", version, about = "Daily artist stream tracker")]
struct Cli {
    /// Directory holding the CSV artifacts (overrides config and XDG default)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum SortBy {
    /// Sort by cumulative play count
    Total,
    /// Sort by day-over-day change
    Delta,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape today's snapshot and update the stream history
    Scrape {
        /// Record under this date instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show current totals and the ranked track table
    Report {
        /// Track table sort order
        #[arg(long, value_enum, default_value = "total")]
        sort: SortBy,

        /// Number of tracks to show (0 = all)
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },

    /// Print the tail of the total-streams series
    History {
        /// Number of rows (0 = all)
        #[arg(short = 'n', long, default_value = "14")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let mut config = streamvault::config::AppConfig::load();

    // Resolve artifact directory: CLI > config > XDG default
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    log::info!("Data directory: {}", config.resolve_data_dir().display());

    match cli.command {
        Commands::Scrape { date } => {
            let date = match date {
                Some(d) => d
                    .parse::<NaiveDate>()
                    .context("Invalid --date (expected YYYY-MM-DD)")?,
                None => Local::now().date_naive(),
            };

            let summary = pipeline::run(&config, date).context("Scrape failed")?;
            println!(
                "Scrape complete for {}: {} rows read, {} excluded, {} tracks after dedup",
                summary.date, summary.raw_rows, summary.excluded, summary.tracks
            );
            println!(
                "Total streams: {} (daily change {})",
                format_count(summary.total_plays),
                format_signed(summary.daily_delta)
            );
            println!("Saved: {}", summary.total_path.display());
            println!("Saved: {}", summary.raw_path.display());
            println!("Saved: {}", summary.deduped_path.display());
        }

        Commands::Report { sort, limit } => {
            let data_dir = config.resolve_data_dir();

            let totals = report::load_totals_sorted(&history::total_history_path(&data_dir))
                .context("Failed to read total history")?;
            match totals.last() {
                Some(latest) => {
                    println!("Total streams: {}", format_count(latest.total_plays));
                    println!("Daily change:  {}", format_signed(latest.daily_delta));
                    println!("Last update:   {}", latest.date);
                    println!();
                }
                None => {
                    println!("No total history yet. Run `streamvault scrape` first.");
                    println!();
                }
            }

            let snap_dir = history::snapshot_dir(&data_dir);
            let (today_file, prev_file) =
                report::latest_pair(&snap_dir).context("Failed to list snapshots")?;
            let Some(today_file) = today_file else {
                println!("No daily snapshot found in {}.", snap_dir.display());
                return Ok(());
            };

            let today = history::load_snapshot(&today_file.path)
                .context("Failed to read today's snapshot")?;
            let previous = match &prev_file {
                Some(f) => Some(
                    history::load_snapshot(&f.path)
                        .context("Failed to read previous snapshot")?,
                ),
                None => None,
            };

            let report_sort = match sort {
                SortBy::Total => ReportSort::TotalPlays,
                SortBy::Delta => ReportSort::DailyChange,
            };
            let rows = report::build_report(today, previous, report_sort, limit);

            if rows.is_empty() {
                println!("Snapshot file is empty.");
                return Ok(());
            }
            print_track_table(&rows);
            println!();
            println!("Using: {}", file_name(&today_file.path));
            match prev_file {
                Some(f) => println!("Previous for change: {}", file_name(&f.path)),
                None => println!("Previous for change: — (only one day recorded)"),
            }
        }

        Commands::History { limit } => {
            let data_dir = config.resolve_data_dir();
            let totals = report::load_totals_sorted(&history::total_history_path(&data_dir))
                .context("Failed to read total history")?;

            if totals.is_empty() {
                println!("No total history yet. Run `streamvault scrape` first.");
                return Ok(());
            }

            let start = if limit == 0 { 0 } else { totals.len().saturating_sub(limit) };
            println!("{:<12} {:>14} {:>12}  {}", "Date", "Total", "Change", "Source");
            println!("{}", "-".repeat(60));
            for entry in &totals[start..] {
                println!(
                    "{:<12} {:>14} {:>12}  {}",
                    entry.date.to_string(),
                    format_count(entry.total_plays),
                    format_signed(entry.daily_delta),
                    entry.source
                );
            }
        }
    }

    Ok(())
}

fn print_track_table(rows: &[ReportRow]) {
    println!(
        "{:>4}  {:<40} {:>14} {:>12}  {:<8}",
        "#", "Title", "Streams", "Change", "Length"
    );
    println!("{}", "-".repeat(84));

    for row in rows {
        let title: String = if row.record.title.chars().count() > 40 {
            let cut: String = row.record.title.chars().take(37).collect();
            format!("{cut}...")
        } else {
            row.record.title.clone()
        };

        println!(
            "{:>4}  {:<40} {:>14} {:>12}  {:<8}",
            row.rank,
            title,
            format_count(row.record.plays),
            format_signed(row.daily_change),
            row.record.duration.as_deref().unwrap_or("—"),
        );
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
