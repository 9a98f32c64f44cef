//! # CLI Module
//!
//! Command-line interface for the photo triage engine.
//!
//! ## Usage
//! ```bash
//! # Scan a library directory
//! photo-triage scan ~/Pictures
//!
//! # Tighter duplicate matching, one album excluded
//! photo-triage scan ~/Pictures --duplicate-threshold 0.98 --exclude-album junk
//!
//! # Review one category interactively
//! photo-triage review ~/Pictures --category blurry
//!
//! # Past scans
//! photo-triage history
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_triage::core::analysis::LumaGridProvider;
use photo_triage::core::history::{HistoryRepository, ScanRecord};
use photo_triage::core::issue::{Decision, Issue, IssueCategory, ScanSettings};
use photo_triage::core::media::{FsMediaStore, MediaStore};
use photo_triage::core::pipeline::{CancellationToken, ScanOutcome, ScanPipeline};
use photo_triage::core::review::{ReviewSession, ReviewState};
use photo_triage::error::{Result, TriageError};
use photo_triage::events::{Event, EventChannel, ScanEvent};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

/// Photo Triage - find the photos you won't miss
#[derive(Parser, Debug)]
#[command(name = "photo-triage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a library directory for quality and redundancy issues
    Scan {
        /// Library root directory
        path: PathBuf,

        #[command(flatten)]
        thresholds: ThresholdArgs,

        /// Album (subdirectory) ids to exclude; repeatable
        #[arg(long = "exclude-album")]
        excluded_albums: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Do not record this scan in history
        #[arg(long)]
        no_history: bool,

        /// History database path
        #[arg(long)]
        history_db: Option<PathBuf>,
    },

    /// Scan, then review one category interactively
    Review {
        /// Library root directory
        path: PathBuf,

        /// Category to review
        #[arg(short, long)]
        category: Category,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Show past scans, most recent first
    History {
        /// Maximum records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Clear all history instead of listing
        #[arg(long)]
        clear: bool,

        /// History database path
        #[arg(long)]
        history_db: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct ThresholdArgs {
    /// Sharpness below this flags an item blurry (0-1)
    #[arg(long)]
    blur_threshold: Option<f64>,

    /// Similarity at or above this makes a duplicate (0-1)
    #[arg(long)]
    duplicate_threshold: Option<f32>,

    /// Similarity at or above this makes a similar pair (0-1)
    #[arg(long)]
    similar_threshold: Option<f32>,

    /// Items processed per batch
    #[arg(long)]
    batch_size: Option<usize>,
}

impl ThresholdArgs {
    fn apply(&self, mut settings: ScanSettings) -> ScanSettings {
        if let Some(v) = self.blur_threshold {
            settings.blur_threshold = v;
        }
        if let Some(v) = self.duplicate_threshold {
            settings.duplicate_threshold = v;
        }
        if let Some(v) = self.similar_threshold {
            settings.similar_threshold = v;
        }
        if let Some(v) = self.batch_size {
            settings.batch_size = v;
        }
        settings
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Category {
    Duplicate,
    Similar,
    Blurry,
    Screenshot,
    ScreenRecording,
    LensSmudge,
    TextHeavy,
    LowQuality,
}

impl From<Category> for IssueCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Duplicate => IssueCategory::Duplicate,
            Category::Similar => IssueCategory::Similar,
            Category::Blurry => IssueCategory::Blurry,
            Category::Screenshot => IssueCategory::Screenshot,
            Category::ScreenRecording => IssueCategory::ScreenRecording,
            Category::LensSmudge => IssueCategory::LensSmudge,
            Category::TextHeavy => IssueCategory::TextHeavy,
            Category::LowQuality => IssueCategory::LowQuality,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (item ids only)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            thresholds,
            excluded_albums,
            output,
            no_history,
            history_db,
        } => run_scan(
            path,
            thresholds,
            excluded_albums,
            output,
            no_history,
            history_db,
        ),
        Commands::Review {
            path,
            category,
            thresholds,
        } => run_review(path, category.into(), thresholds),
        Commands::History {
            limit,
            clear,
            history_db,
        } => run_history(limit, clear, history_db),
    }
}

fn default_history_db() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photo-triage")
        .join("history.db")
}

fn build_pipeline(
    store: Arc<dyn MediaStore>,
    settings: ScanSettings,
) -> Result<ScanPipeline> {
    ScanPipeline::builder()
        .store(store)
        .analysis(Arc::new(LumaGridProvider::new()))
        .settings(settings)
        .build()
}

/// Run a scan with a live progress bar, returning the outcome
fn scan_with_progress(pipeline: &ScanPipeline, show_bar: bool) -> Result<ScanOutcome> {
    let (sender, receiver) = EventChannel::new();

    let progress = if show_bar {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Scan(ScanEvent::Started { total_items }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_length(total_items as u64);
                        pb.set_message("Scanning");
                    }
                }
                Event::Scan(ScanEvent::Progress(p)) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_position(p.processed as u64);
                    }
                }
                Event::Cluster(cluster) => {
                    if let (Some(pb), photo_triage::events::ClusterEvent::Started { pass, .. }) =
                        (progress_clone.as_ref(), &cluster)
                    {
                        pb.set_message(format!("Grouping: {pass}"));
                    }
                }
                Event::Scan(ScanEvent::Completed { .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.finish_and_clear();
                    }
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&sender, &CancellationToken::new());

    drop(sender);
    event_thread.join().ok();

    result
}

fn run_scan(
    path: PathBuf,
    thresholds: ThresholdArgs,
    excluded_albums: Vec<String>,
    output: OutputFormat,
    no_history: bool,
    history_db: Option<PathBuf>,
) -> Result<()> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Photo Triage").bold().cyan(),
            style(env!("CARGO_PKG_VERSION")).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let mut settings = thresholds.apply(ScanSettings::default());
    settings.excluded_album_ids = excluded_albums.into_iter().collect();

    let store: Arc<dyn MediaStore> = Arc::new(FsMediaStore::new(path));
    let pipeline = build_pipeline(store, settings)?;

    let outcome = scan_with_progress(&pipeline, matches!(output, OutputFormat::Pretty))?;

    if !no_history {
        let db_path = history_db.unwrap_or_else(default_history_db);
        let repo = HistoryRepository::open(&db_path)?;
        let scan_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        repo.save(&record_for(&outcome, scan_time))?;
    }

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &outcome),
        OutputFormat::Json => print_json_results(&outcome)?,
        OutputFormat::Minimal => print_minimal_results(&outcome),
    }

    Ok(())
}

fn record_for(outcome: &ScanOutcome, scan_time: i64) -> ScanRecord {
    let mut seen = std::collections::HashSet::new();
    let reclaimable_bytes = outcome
        .issues
        .iter()
        .filter(|issue| seen.insert(issue.item_id.as_str()))
        .map(|issue| issue.file_size)
        .sum();

    ScanRecord {
        id: HistoryRepository::generate_id(),
        scan_time,
        total_items: outcome.total_items,
        category_counts: outcome.progress.category_counts.clone(),
        reclaimable_bytes,
        duration_ms: outcome.duration_ms,
        status: photo_triage::core::history::ScanStatus::Completed,
    }
}

fn print_pretty_results(term: &Term, outcome: &ScanOutcome) {
    term.write_line("").ok();
    term.write_line(&format!("{} Scan Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} items scanned in {:.1}s",
        style(outcome.total_items).cyan(),
        outcome.duration_ms as f64 / 1000.0
    ))
    .ok();

    if outcome.issues.is_empty() {
        term.write_line(&format!("  {} Nothing to clean up!", style("🎉").green()))
            .ok();
        return;
    }

    term.write_line(&format!(
        "  {} issues found",
        style(outcome.issues.len()).cyan()
    ))
    .ok();
    term.write_line("").ok();

    for category in IssueCategory::ALL {
        let count = outcome.progress.count(category);
        if count > 0 {
            term.write_line(&format!(
                "  {:<18} {}",
                category.display_name(),
                style(count).yellow()
            ))
            .ok();
        }
    }

    let mut seen = std::collections::HashSet::new();
    let reclaimable: u64 = outcome
        .issues
        .iter()
        .filter(|issue| seen.insert(issue.item_id.as_str()))
        .map(|issue| issue.file_size)
        .sum();

    term.write_line("").ok();
    term.write_line(&format!(
        "  {} reclaimable",
        style(format_bytes(reclaimable)).yellow()
    ))
    .ok();
}

fn print_json_results(outcome: &ScanOutcome) -> Result<()> {
    let value = serde_json::json!({
        "total_items": outcome.total_items,
        "duration_ms": outcome.duration_ms,
        "progress": outcome.progress,
        "issues": outcome.issues,
    });
    let rendered = serde_json::to_string_pretty(&value)
        .map_err(|e| TriageError::Config(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn print_minimal_results(outcome: &ScanOutcome) {
    for issue in &outcome.issues {
        println!("{}\t{}", issue.category.as_str(), issue.item_id);
    }
}

fn run_review(path: PathBuf, category: IssueCategory, thresholds: ThresholdArgs) -> Result<()> {
    let term = Term::stderr();

    let settings = thresholds.apply(ScanSettings::default());
    let store: Arc<dyn MediaStore> = Arc::new(FsMediaStore::new(path));
    let pipeline = build_pipeline(Arc::clone(&store), settings)?;

    let outcome = scan_with_progress(&pipeline, true)?;

    let issues: Vec<Issue> = outcome
        .issues
        .into_iter()
        .filter(|issue| issue.category == category)
        .collect();

    if issues.is_empty() {
        term.write_line(&format!(
            "{} No {} found",
            style("✓").green(),
            category.display_name().to_lowercase()
        ))
        .ok();
        return Ok(());
    }

    term.write_line(&format!(
        "{} {} to review. [d]elete [k]eep [u]ndo [c]ommit [q]uit",
        style(issues.len()).cyan(),
        category.display_name().to_lowercase()
    ))
    .ok();

    let mut session = ReviewSession::new(issues, category);

    loop {
        match session.state() {
            ReviewState::AllReviewed => {
                term.write_line(&format!(
                    "All reviewed: {} marked, {} freeable. [c]ommit [u]ndo [q]uit",
                    session.marked_for_deletion().count(),
                    format_bytes(session.total_freeable())
                ))
                .ok();
            }
            ReviewState::Reviewing => {
                if let Some(issue) = session.current_issue() {
                    term.write_line(&format!(
                        "[{}/{}] {} ({}, {:.0}% confidence)",
                        session.cursor() + 1,
                        session.issues().len(),
                        style(&issue.item_id).bold(),
                        format_bytes(issue.file_size),
                        issue.confidence * 100.0
                    ))
                    .ok();
                }
            }
            _ => {}
        }

        let key = term
            .read_char()
            .map_err(|e| TriageError::Config(e.to_string()))?;

        match key {
            'd' => session.decide(Decision::Delete),
            'k' => session.decide(Decision::Keep),
            'u' => session.undo(),
            'c' => {
                commit_review(&term, &mut session, &store);
                if matches!(session.state(), ReviewState::DeletionSuccess { .. }) {
                    break;
                }
            }
            'q' => break,
            _ => {}
        }
    }

    Ok(())
}

fn commit_review(term: &Term, session: &mut ReviewSession, store: &Arc<dyn MediaStore>) {
    let ids: Vec<String> = session
        .marked_for_deletion()
        .map(|issue| issue.item_id.clone())
        .collect();

    if ids.is_empty() {
        term.write_line("Nothing marked for deletion").ok();
        return;
    }

    match store.delete(&ids) {
        Ok(()) => {
            session.commit_deletion();
            if let ReviewState::DeletionSuccess { count, bytes } = session.state() {
                term.write_line(&format!(
                    "{} Deleted {} item(s), freed {}",
                    style("✓").green().bold(),
                    count,
                    format_bytes(*bytes)
                ))
                .ok();
            }
        }
        Err(e) => {
            session.handle_deletion_error(e.to_string());
            term.write_line(&format!(
                "{} Deletion failed: {e}. Decisions kept - retry with 'c'",
                style("✗").red().bold()
            ))
            .ok();
        }
    }
}

fn run_history(limit: usize, clear: bool, history_db: Option<PathBuf>) -> Result<()> {
    let term = Term::stdout();
    let db_path = history_db.unwrap_or_else(default_history_db);
    let repo = HistoryRepository::open(&db_path)?;

    if clear {
        let removed = repo.clear()?;
        term.write_line(&format!("Cleared {removed} record(s)")).ok();
        return Ok(());
    }

    let history = repo.list_recent(limit, 0)?;
    if history.records.is_empty() {
        term.write_line("No scans recorded yet").ok();
        return Ok(());
    }

    for record in &history.records {
        term.write_line(&format!(
            "{}  {} items, {} issues, {} reclaimable ({})",
            style(format_timestamp(record.scan_time)).cyan(),
            record.total_items,
            record.total_issues(),
            format_bytes(record.reclaimable_bytes),
            record.status.as_str()
        ))
        .ok();
    }

    Ok(())
}

fn format_timestamp(unix_seconds: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(unix_seconds, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| unix_seconds.to_string())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
