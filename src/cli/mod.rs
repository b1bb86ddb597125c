//! # CLI Module
//!
//! Command-line interface for the photo archiver.
//!
//! ## Usage
//! ```bash
//! # Archive a memory card, deleting what was safely copied
//! photo-archive archive /media/card/DCIM --media-dir ~/Media --delete-source
//!
//! # Drop database rows whose archived file is gone
//! photo-archive scan-missing --media-dir ~/Media
//!
//! # Is this file (or hash) archived already?
//! photo-archive lookup IMG_1427.JPG --media-dir ~/Media
//!
//! # Collect new pictures into a staging folder
//! photo-archive collect ~/Staging --output json
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_archiver::core::archive::{ArchiveOrchestrator, ArchiveReport};
use photo_archiver::core::collect::{CollectReport, PhotoCollector};
use photo_archiver::core::consistency::{ConsistencyReport, ConsistencyScanner};
use photo_archiver::core::metadata::fingerprint_file;
use photo_archiver::core::repository::{ContentRepository, HashLookup};
use photo_archiver::error::{ArchiveError, ExtractionError, Result};
use photo_archiver::events::{
    ArchiveEvent, CollectEvent, ConsistencyEvent, Event, EventChannel, EventReceiver,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Photo Archiver - one copy of every photo, filed by date
#[derive(Parser, Debug)]
#[command(name = "photo-archive")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy new photos from a source directory into the archive
    Archive {
        /// Directory to archive
        source: PathBuf,

        /// Archive root holding media.db and photos/
        #[arg(short, long)]
        media_dir: PathBuf,

        /// Delete sources once their archive copy is verified
        #[arg(long)]
        delete_source: bool,

        /// Prune rows whose archived file is gone after archiving
        #[arg(long)]
        scan_missing: bool,

        /// Group id given to newly archived files
        #[arg(long)]
        group: Option<u32>,
    },

    /// Remove database rows whose archived file no longer exists
    ScanMissing {
        /// Archive root holding media.db and photos/
        #[arg(short, long)]
        media_dir: PathBuf,
    },

    /// Look up a file or an MD5 hash in the archive
    Lookup {
        /// A file to fingerprint, or a hex MD5 hash
        target: String,

        /// Archive root holding media.db and photos/
        #[arg(short, long)]
        media_dir: PathBuf,
    },

    /// Copy photos added since the last collection into a staging directory
    Collect {
        /// Flat directory to copy new photos into
        staging: PathBuf,

        /// Directory to collect from (default: the pictures folder)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Where collection status is kept
        #[arg(long)]
        status_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

impl OutputFormat {
    fn is_pretty(self) -> bool {
        matches!(self, OutputFormat::Pretty)
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    photo_archiver::init_tracing(cli.verbose);

    match cli.command {
        Commands::Archive {
            source,
            media_dir,
            delete_source,
            scan_missing,
            group,
        } => run_archive(
            &source,
            &media_dir,
            delete_source,
            scan_missing,
            group,
            cli.output,
        ),
        Commands::ScanMissing { media_dir } => run_scan_missing(&media_dir, cli.output),
        Commands::Lookup { target, media_dir } => run_lookup(&target, &media_dir, cli.output),
        Commands::Collect {
            staging,
            source,
            status_dir,
        } => run_collect(&staging, source, status_dir, cli.output),
    }
}

fn run_archive(
    source: &Path,
    media_dir: &Path,
    delete_source: bool,
    scan_missing: bool,
    group: Option<u32>,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();
    if output.is_pretty() {
        print_header(&term);
    }

    let repository = ContentRepository::open(media_dir)?;

    let (sender, receiver) = EventChannel::new();
    let progress = output.is_pretty().then(spinner);
    let event_thread = spawn_progress(receiver, progress);

    let result = ArchiveOrchestrator::new(&repository)
        .delete_source(delete_source)
        .scan_missing(scan_missing)
        .group_id(group)
        .with_events(sender)
        .run(source);

    // The orchestrator, and with it the sender, is gone; the thread drains and exits
    event_thread.join().ok();

    let report = result?;
    repository.close()?;

    match output {
        OutputFormat::Pretty => print_archive_report(&term, &report),
        OutputFormat::Json => print_json(&report),
    }
    Ok(())
}

fn run_scan_missing(media_dir: &Path, output: OutputFormat) -> Result<()> {
    let term = Term::stderr();
    if output.is_pretty() {
        print_header(&term);
    }

    let repository = ContentRepository::open(media_dir)?;

    let (sender, receiver) = EventChannel::new();
    let progress = output.is_pretty().then(spinner);
    let event_thread = spawn_progress(receiver, progress);

    let result = ConsistencyScanner::new(&repository)
        .with_events(sender)
        .scan_missing();
    event_thread.join().ok();

    let report = result?;
    repository.close()?;

    match output {
        OutputFormat::Pretty => print_consistency_report(&term, &report),
        OutputFormat::Json => print_json(&report),
    }
    Ok(())
}

fn run_lookup(target: &str, media_dir: &Path, output: OutputFormat) -> Result<()> {
    let path = Path::new(target);
    let fingerprint = if path.is_file() {
        fingerprint_file(path).map_err(|source| ExtractionError::Io {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        target.to_lowercase()
    };

    let repository = ContentRepository::open(media_dir)?;
    let archive_path = repository.archive_path_for(&fingerprint)?;
    repository.close()?;

    match output {
        OutputFormat::Pretty => {
            let line = match &archive_path {
                Some(archived) => format!(
                    "{} {} is archived at {}",
                    style("✓").green().bold(),
                    style(&fingerprint).dim(),
                    archived.display()
                ),
                None => format!(
                    "{} {} is not archived",
                    style("○").dim(),
                    style(&fingerprint).dim()
                ),
            };
            Term::stdout().write_line(&line).ok();
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "fingerprint": fingerprint,
            "archive_path": archive_path,
        })),
    }
    Ok(())
}

fn run_collect(
    staging: &Path,
    source: Option<PathBuf>,
    status_dir: Option<PathBuf>,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();
    if output.is_pretty() {
        print_header(&term);
    }

    let source = source
        .or_else(PhotoCollector::default_source_dir)
        .ok_or_else(|| {
            ArchiveError::Config("No pictures folder on this system, pass --source".to_string())
        })?;
    let status_dir = status_dir
        .or_else(PhotoCollector::default_status_dir)
        .ok_or_else(|| {
            ArchiveError::Config("No local data folder on this system, pass --status-dir".to_string())
        })?;

    let (sender, receiver) = EventChannel::new();
    let progress = output.is_pretty().then(spinner);
    let event_thread = spawn_progress(receiver, progress);

    let result = PhotoCollector::new(status_dir)
        .with_events(sender)
        .collect(&source, staging);
    event_thread.join().ok();

    let report = result?;
    match output {
        OutputFormat::Pretty => print_collect_report(&term, &report, staging),
        OutputFormat::Json => print_json(&report),
    }
    Ok(())
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Drain events on a UI thread until every sender is dropped
fn spawn_progress(
    receiver: EventReceiver,
    progress: Option<ProgressBar>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress else {
                continue;
            };

            match event {
                Event::Archive(ArchiveEvent::VerificationFailed { source, .. }) => {
                    pb.println(format!(
                        "{} copy of {} did not verify, source kept",
                        style("!").yellow().bold(),
                        source.display()
                    ));
                }
                Event::Archive(ArchiveEvent::Completed { .. }) => pb.set_message("Finishing"),
                Event::Archive(e) => pb.set_message(e.to_string()),
                Event::Consistency(ConsistencyEvent::Started) => {
                    pb.set_message("Checking archived files")
                }
                Event::Consistency(ConsistencyEvent::MissingFile { path, .. }) => {
                    pb.println(format!(
                        "{} missing {}",
                        style("✗").red(),
                        path.display()
                    ));
                }
                Event::Consistency(ConsistencyEvent::Completed { .. }) => {}
                Event::Collect(CollectEvent::Started { source, .. }) => {
                    pb.set_message(format!("Collecting from {}", source.display()))
                }
                Event::Collect(CollectEvent::FileCollected { source, .. }) => {
                    pb.set_message(format!("Collected {}", source.display()))
                }
                Event::Collect(CollectEvent::Completed { .. }) => {}
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
    })
}

fn print_header(term: &Term) {
    term.write_line(&format!(
        "{} {}",
        style("Photo Archiver").bold().cyan(),
        style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line("").ok();
}

fn print_archive_report(term: &Term, report: &ArchiveReport) {
    term.write_line(&format!(
        "{} Archive Complete",
        style("✓").green().bold()
    ))
    .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files seen in {:.1}s",
        style(report.files_seen).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} newly archived", style(report.archived).cyan()))
        .ok();

    let lines = [
        (report.reclaimed, "re-archived after their copy vanished"),
        (report.already_archived, "already in the archive"),
        (report.duplicates_deleted, "duplicates deleted"),
        (report.duplicates_kept, "duplicates left in place"),
        (report.sources_deleted, "sources deleted after verification"),
    ];
    for (count, label) in lines {
        if count > 0 {
            term.write_line(&format!("  {} {}", style(count).cyan(), label))
                .ok();
        }
    }

    if report.verification_failures > 0 {
        term.write_line(&format!(
            "  {} copies failed verification, their sources were kept",
            style(report.verification_failures).red().bold()
        ))
        .ok();
    }
    if report.skipped > 0 {
        term.write_line(&format!(
            "  {} entries skipped",
            style(report.skipped).yellow()
        ))
        .ok();
    }

    if let Some(consistency) = &report.consistency {
        term.write_line("").ok();
        print_consistency_report(term, consistency);
    }
}

fn print_consistency_report(term: &Term, report: &ConsistencyReport) {
    term.write_line(&format!(
        "{} Checked {} archived photos",
        style("✓").green().bold(),
        style(report.checked).cyan()
    ))
    .ok();

    if report.removed.is_empty() {
        term.write_line("  Every archived file is present").ok();
        return;
    }

    term.write_line(&format!(
        "  {} missing files removed from the database:",
        style(report.removed.len()).yellow()
    ))
    .ok();
    for entry in &report.removed {
        term.write_line(&format!(
            "    {} {}",
            style("✗").red(),
            entry.archive_path.display()
        ))
        .ok();
    }
}

fn print_collect_report(term: &Term, report: &CollectReport, staging: &Path) {
    term.write_line(&format!(
        "{} Collected {} new photos into {} in {:.1}s",
        style("✓").green().bold(),
        style(report.collected.len()).cyan(),
        staging.display(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}
