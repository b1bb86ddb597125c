//! The scan-and-archive workflow.

use super::copier::{FileCopier, PreservingCopier};
use super::filter::SourceFilter;
use super::planner::ArchivePathPlanner;
use crate::core::consistency::{ConsistencyReport, ConsistencyScanner};
use crate::core::photo::Photo;
use crate::core::repository::ContentRepository;
use crate::error::{RepositoryError, Result, ScanError};
use crate::events::{null_sender, ArchiveEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Options for an archive run
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Remove sources that were archived and verified, or already archived elsewhere
    pub delete_source: bool,
    /// Run a consistency scan after the archive pass
    pub scan_missing: bool,
    /// Group id given to newly archived files
    pub group_id: Option<u32>,
    pub filter: SourceFilter,
}

/// Counts for one archive run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveReport {
    /// Regular files that passed the filter
    pub files_seen: usize,
    /// Copied into the archive for the first time
    pub archived: usize,
    /// Copied again because the recorded archive file had vanished
    pub reclaimed: usize,
    /// The scanned file was the archive copy itself
    pub already_archived: usize,
    pub duplicates_deleted: usize,
    /// Duplicates left in place because deletion was not requested
    pub duplicates_kept: usize,
    /// Entries that were not files, or files that could not be processed
    pub skipped: usize,
    pub verification_failures: usize,
    /// Verified archives whose source was removed
    pub sources_deleted: usize,
    /// Non-fatal problems, one message each
    pub errors: Vec<String>,
    /// Result of the follow-up consistency scan, when requested
    pub consistency: Option<ConsistencyReport>,
    pub duration_ms: u64,
}

/// Why a source is waiting for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingDelete {
    Duplicate,
    Archived,
}

/// Result of copying one photo into the archive
enum Stored {
    Verified,
    Unverified,
    Failed,
}

/// Walks a source tree and archives what the repository hasn't seen.
///
/// Each regular file is fingerprinted and classified against the repository:
/// new content is copied, a recorded file that vanished from the archive is
/// copied again, the archive copy itself is left alone and duplicates are
/// deleted or kept depending on the options. Sources are only deleted after
/// the walk has finished.
pub struct ArchiveOrchestrator<'r> {
    repository: &'r ContentRepository,
    planner: ArchivePathPlanner,
    options: ArchiveOptions,
    copier: Box<dyn FileCopier + 'r>,
    events: EventSender,
}

impl<'r> ArchiveOrchestrator<'r> {
    pub fn new(repository: &'r ContentRepository) -> Self {
        Self {
            planner: ArchivePathPlanner::new(repository.base_dir()),
            repository,
            options: ArchiveOptions::default(),
            copier: Box::new(PreservingCopier),
            events: null_sender(),
        }
    }

    pub fn options(mut self, options: ArchiveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn delete_source(mut self, delete: bool) -> Self {
        self.options.delete_source = delete;
        self
    }

    pub fn scan_missing(mut self, scan: bool) -> Self {
        self.options.scan_missing = scan;
        self
    }

    pub fn group_id(mut self, gid: Option<u32>) -> Self {
        self.options.group_id = gid;
        self
    }

    pub fn filter(mut self, filter: SourceFilter) -> Self {
        self.options.filter = filter;
        self
    }

    /// Replace how bytes are copied into the archive
    pub fn with_copier(mut self, copier: Box<dyn FileCopier + 'r>) -> Self {
        self.copier = copier;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Archive everything under `source`.
    ///
    /// Per-file failures are logged and counted; a missing source directory
    /// or a repository failure aborts the run.
    pub fn run(&self, source: &Path) -> Result<ArchiveReport> {
        let start = Instant::now();

        if !source.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: source.to_path_buf(),
            }
            .into());
        }

        info!("Archiving photos from {}", source.display());
        self.emit(ArchiveEvent::Started {
            source: source.to_path_buf(),
        });

        let mut report = ArchiveReport::default();
        let mut pending = Vec::new();

        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = walk_error(path.clone(), e);
                    self.skip(&mut report, &path, error.to_string());
                    continue;
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                debug!("Descending into {}", path.display());
                continue;
            }

            if !file_type.is_file() {
                self.skip(&mut report, path, "not a regular file".to_string());
                continue;
            }

            if !self.options.filter.should_include(path) {
                debug!("Ignoring {}", path.display());
                continue;
            }

            report.files_seen += 1;
            if let Some(reason) = self.process_file(path, &mut report)? {
                pending.push((path.to_path_buf(), reason));
            }
        }

        self.delete_pending(&pending, &mut report);

        if self.options.scan_missing {
            let scanner =
                ConsistencyScanner::new(self.repository).with_events(self.events.clone());
            report.consistency = Some(scanner.scan_missing()?);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Archive pass finished: {} seen, {} archived, {} reclaimed, {} duplicates",
            report.files_seen,
            report.archived,
            report.reclaimed,
            report.duplicates_deleted + report.duplicates_kept
        );
        self.emit(ArchiveEvent::Completed {
            files_seen: report.files_seen,
            archived: report.archived,
        });

        Ok(report)
    }

    /// Classify one file and act on it. Returns why it should be deleted, if it should.
    fn process_file(
        &self,
        path: &Path,
        report: &mut ArchiveReport,
    ) -> std::result::Result<Option<PendingDelete>, RepositoryError> {
        let mut photo = Photo::new(path);
        let fingerprint = match photo.fingerprint() {
            Ok(fingerprint) => fingerprint.to_string(),
            Err(e) => {
                self.skip(report, path, e.to_string());
                return Ok(None);
            }
        };

        let Some(entry) = self.repository.lookup_hash(&fingerprint)? else {
            return match self.store(&mut photo, &fingerprint, report)? {
                Stored::Failed => Ok(None),
                stored => {
                    report.archived += 1;
                    let destination = photo.archive_path.clone().unwrap_or_default();
                    self.emit(ArchiveEvent::FileArchived {
                        source: path.to_path_buf(),
                        destination,
                    });
                    Ok(self.delete_if_verified(stored))
                }
            };
        };

        if !entry.archive_path.exists() {
            info!(
                "Archived copy {} of {} is gone, archiving it again",
                entry.archive_path.display(),
                path.display()
            );
            photo.db_id = Some(entry.id);
            return match self.store(&mut photo, &fingerprint, report)? {
                Stored::Failed => Ok(None),
                stored => {
                    report.reclaimed += 1;
                    let destination = photo.archive_path.clone().unwrap_or_default();
                    self.emit(ArchiveEvent::Reclaimed {
                        source: path.to_path_buf(),
                        destination,
                    });
                    Ok(self.delete_if_verified(stored))
                }
            };
        }

        if same_file(&entry.archive_path, path) {
            debug!("{} is already archived", path.display());
            report.already_archived += 1;
            self.emit(ArchiveEvent::AlreadyArchived {
                path: path.to_path_buf(),
            });
            return Ok(None);
        }

        self.emit(ArchiveEvent::DuplicateFound {
            source: path.to_path_buf(),
            archived_at: entry.archive_path.clone(),
        });

        if self.options.delete_source {
            if !self.verify_copy(path, &entry.archive_path, &fingerprint, report) {
                return Ok(None);
            }
            info!(
                "{} duplicates {}, deleting it",
                path.display(),
                entry.archive_path.display()
            );
            Ok(Some(PendingDelete::Duplicate))
        } else {
            info!(
                "{} duplicates {}, leaving it in place",
                path.display(),
                entry.archive_path.display()
            );
            report.duplicates_kept += 1;
            Ok(None)
        }
    }

    /// Copy into a freshly planned path, record it, then check the copy
    fn store(
        &self,
        photo: &mut Photo,
        fingerprint: &str,
        report: &mut ArchiveReport,
    ) -> std::result::Result<Stored, RepositoryError> {
        let source = photo.source_path().to_path_buf();

        let dir = match self.planner.plan(photo) {
            Ok(dir) => dir,
            Err(e) => {
                self.skip(report, &source, e.to_string());
                return Ok(Stored::Failed);
            }
        };

        let destination = match ArchivePathPlanner::copy_into(self.copier.as_ref(), &source, &dir)
        {
            Ok(destination) => destination,
            Err(e) => {
                self.skip(
                    report,
                    &source,
                    format!("copy into {} failed: {}", dir.display(), e),
                );
                return Ok(Stored::Failed);
            }
        };

        let record = match photo.to_record(&destination) {
            Ok(record) => record,
            Err(e) => {
                self.skip(report, &source, e.to_string());
                return Ok(Stored::Failed);
            }
        };

        let id = self.repository.add_or_update(&record)?;
        photo.db_id = Some(id);
        photo.archive_path = Some(destination.clone());
        info!("Archived {} to {}", source.display(), destination.display());

        if let Some(gid) = self.options.group_id {
            assign_group(&destination, gid);
        }

        if self.verify_copy(&source, &destination, fingerprint, report) {
            Ok(Stored::Verified)
        } else {
            Ok(Stored::Unverified)
        }
    }

    /// Re-fingerprint an archive copy; a mismatch is recorded and the source kept
    fn verify_copy(
        &self,
        source: &Path,
        copy: &Path,
        fingerprint: &str,
        report: &mut ArchiveReport,
    ) -> bool {
        match Photo::new(copy).fingerprint() {
            Ok(copied) if copied == fingerprint => true,
            Ok(copied) => {
                warn!(
                    "Copy {} hashes to {} but source {} hashes to {}, keeping the source",
                    copy.display(),
                    copied,
                    source.display(),
                    fingerprint
                );
                self.record_unverified(report, source.to_path_buf(), copy.to_path_buf());
                false
            }
            Err(e) => {
                warn!(
                    "Could not re-read copy {}: {}, keeping the source",
                    copy.display(),
                    e
                );
                self.record_unverified(report, source.to_path_buf(), copy.to_path_buf());
                false
            }
        }
    }

    fn record_unverified(&self, report: &mut ArchiveReport, source: PathBuf, destination: PathBuf) {
        report.verification_failures += 1;
        report.errors.push(format!(
            "verification of {} failed",
            destination.display()
        ));
        self.emit(ArchiveEvent::VerificationFailed {
            source,
            destination,
        });
    }

    fn delete_if_verified(&self, stored: Stored) -> Option<PendingDelete> {
        match stored {
            Stored::Verified if self.options.delete_source => Some(PendingDelete::Archived),
            _ => None,
        }
    }

    fn delete_pending(&self, pending: &[(PathBuf, PendingDelete)], report: &mut ArchiveReport) {
        for (path, reason) in pending {
            match fs::remove_file(path) {
                Ok(()) => {
                    debug!("Deleted source {}", path.display());
                    match reason {
                        PendingDelete::Duplicate => report.duplicates_deleted += 1,
                        PendingDelete::Archived => report.sources_deleted += 1,
                    }
                    self.emit(ArchiveEvent::SourceDeleted { path: path.clone() });
                }
                Err(e) => {
                    warn!("Failed to delete source {}: {}", path.display(), e);
                    report
                        .errors
                        .push(format!("failed to delete {}: {}", path.display(), e));
                }
            }
        }
    }

    fn skip(&self, report: &mut ArchiveReport, path: &Path, reason: String) {
        warn!("Skipping {}: {}", path.display(), reason);
        report.skipped += 1;
        report
            .errors
            .push(format!("{}: {}", path.display(), reason));
        self.emit(ArchiveEvent::Skipped {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn emit(&self, event: ArchiveEvent) {
        self.events.send(Event::Archive(event));
    }
}

/// Whether two paths name the same file on disk
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn walk_error(path: PathBuf, error: walkdir::Error) -> ScanError {
    let kind = error.io_error().map(io::Error::kind);
    match kind {
        Some(io::ErrorKind::PermissionDenied) => ScanError::PermissionDenied { path },
        _ => ScanError::ReadDirectory {
            path,
            source: error
                .into_io_error()
                .unwrap_or_else(|| io::Error::other("filesystem loop")),
        },
    }
}

#[cfg(unix)]
fn assign_group(path: &Path, gid: u32) {
    if let Err(e) = std::os::unix::fs::chown(path, None, Some(gid)) {
        warn!(
            "Failed to give {} group {}: {}",
            path.display(),
            gid,
            e
        );
    }
}

#[cfg(not(unix))]
fn assign_group(path: &Path, gid: u32) {
    warn!(
        "Cannot give {} group {} on this platform",
        path.display(),
        gid
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct Setup {
        _media: TempDir,
        source: TempDir,
        repository: ContentRepository,
    }

    fn setup() -> Setup {
        let media = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let repository = ContentRepository::open(media.path()).unwrap();
        Setup {
            _media: media,
            source,
            repository,
        }
    }

    /// Fails every copy
    struct BrokenCopier;

    impl FileCopier for BrokenCopier {
        fn copy(&self, _source: &Path, _destination: &Path) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    /// Counts copies while delegating to the real copier
    struct CountingCopier<'a>(&'a Cell<usize>);

    impl FileCopier for CountingCopier<'_> {
        fn copy(&self, source: &Path, destination: &Path) -> io::Result<()> {
            self.0.set(self.0.get() + 1);
            PreservingCopier.copy(source, destination)
        }
    }

    #[test]
    fn missing_source_directory_is_fatal() {
        let s = setup();
        let result = ArchiveOrchestrator::new(&s.repository)
            .run(&s.source.path().join("does-not-exist"));
        assert!(result.is_err());
    }

    #[test]
    fn new_file_is_archived_and_recorded() {
        let s = setup();
        fs::write(s.source.path().join("a.jpg"), b"aaa").unwrap();

        let report = ArchiveOrchestrator::new(&s.repository)
            .run(s.source.path())
            .unwrap();

        assert_eq!(report.files_seen, 1);
        assert_eq!(report.archived, 1);
        assert_eq!(s.repository.count().unwrap(), 1);
        assert!(s.source.path().join("a.jpg").exists());
    }

    #[test]
    fn failed_copy_is_skipped_without_a_record() {
        let s = setup();
        fs::write(s.source.path().join("a.jpg"), b"aaa").unwrap();

        let report = ArchiveOrchestrator::new(&s.repository)
            .with_copier(Box::new(BrokenCopier))
            .delete_source(true)
            .run(s.source.path())
            .unwrap();

        assert_eq!(report.archived, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(s.repository.count().unwrap(), 0);
        assert!(s.source.path().join("a.jpg").exists());
    }

    #[test]
    fn duplicate_without_delete_is_kept() {
        let s = setup();
        fs::write(s.source.path().join("a.jpg"), b"same").unwrap();
        fs::write(s.source.path().join("b.jpg"), b"same").unwrap();

        let report = ArchiveOrchestrator::new(&s.repository)
            .run(s.source.path())
            .unwrap();

        assert_eq!(report.archived, 1);
        assert_eq!(report.duplicates_kept, 1);
        assert!(s.source.path().join("b.jpg").exists());
    }

    #[test]
    fn archive_copy_itself_is_already_archived() {
        let s = setup();
        fs::write(s.source.path().join("a.jpg"), b"aaa").unwrap();
        ArchiveOrchestrator::new(&s.repository)
            .run(s.source.path())
            .unwrap();

        let photos = s.repository.base_dir().join("photos");
        let counter = Cell::new(0);
        let report = ArchiveOrchestrator::new(&s.repository)
            .with_copier(Box::new(CountingCopier(&counter)))
            .delete_source(true)
            .run(&photos)
            .unwrap();

        assert_eq!(report.already_archived, 1);
        assert_eq!(report.sources_deleted + report.duplicates_deleted, 0);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn vanished_archive_copy_is_reclaimed_under_same_row() {
        let s = setup();
        fs::write(s.source.path().join("a.jpg"), b"aaa").unwrap();
        ArchiveOrchestrator::new(&s.repository)
            .run(s.source.path())
            .unwrap();

        let entry = s.repository.iter_all_photos().next().unwrap().unwrap();
        fs::remove_file(&entry.archive_path).unwrap();

        let report = ArchiveOrchestrator::new(&s.repository)
            .run(s.source.path())
            .unwrap();

        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.archived, 0);
        let after = s.repository.lookup_hash(&md5_of(b"aaa")).unwrap().unwrap();
        assert_eq!(after.id, entry.id);
        assert!(after.archive_path.exists());
    }

    #[test]
    fn ignored_files_are_not_seen() {
        let s = setup();
        fs::write(s.source.path().join("desktop.ini"), b"[.ShellClassInfo]").unwrap();

        let report = ArchiveOrchestrator::new(&s.repository)
            .run(s.source.path())
            .unwrap();

        assert_eq!(report.files_seen, 0);
        assert_eq!(s.repository.count().unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let s = setup();
        let target = s.source.path().join("a.jpg");
        fs::write(&target, b"aaa").unwrap();
        std::os::unix::fs::symlink(&target, s.source.path().join("link.jpg")).unwrap();

        let report = ArchiveOrchestrator::new(&s.repository)
            .run(s.source.path())
            .unwrap();

        assert_eq!(report.files_seen, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn same_file_compares_resolved_paths() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, b"a").unwrap();
        let dotted = temp_dir.path().join(".").join("a.jpg");

        assert!(same_file(&path, &dotted));
        assert!(!same_file(&path, &temp_dir.path().join("b.jpg")));
    }

    fn md5_of(bytes: &[u8]) -> String {
        format!("{:x}", md5::compute(bytes))
    }
}
