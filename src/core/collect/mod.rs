//! # Collect Module
//!
//! Incremental collection of new photos into a flat staging directory,
//! ahead of archiving them.
//!
//! Only directories modified since the previous collection of the same
//! source are looked at. The last collection time is advanced only when
//! every candidate was copied.

mod status;

pub use status::{CollectionStatus, STATUS_FILE};

use crate::core::archive::{ArchivePathPlanner, FileCopier, PreservingCopier, SourceFilter};
use crate::core::metadata::system_time_to_epoch;
use crate::error::{CollectError, Result, ScanError};
use crate::events::{null_sender, CollectEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Sub-directory of the platform data dir used for status by default
const STATUS_DIR_NAME: &str = "photo-archiver";

/// Outcome of one collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectReport {
    /// Previous collection time used as the cut-off
    pub since: i64,
    /// Copies made in the staging directory
    pub collected: Vec<PathBuf>,
    pub duration_ms: u64,
}

/// Regular files under `source` whose directory changed at or after `since`
pub fn find_new_photos(
    source: &Path,
    since: i64,
    filter: &SourceFilter,
) -> std::result::Result<Vec<PathBuf>, ScanError> {
    if !source.is_dir() {
        return Err(ScanError::DirectoryNotFound {
            path: source.to_path_buf(),
        });
    }

    let mut changed_dirs = HashSet::new();
    let mut found = Vec::new();

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        let path = entry.path();

        if entry.file_type().is_dir() {
            if dir_changed_since(path, since) {
                info!(
                    "{} was modified since the last collection",
                    path.display()
                );
                changed_dirs.insert(path.to_path_buf());
            }
            continue;
        }

        if !entry.file_type().is_file() || !filter.should_include(path) {
            continue;
        }

        if path.parent().is_some_and(|p| changed_dirs.contains(p)) {
            found.push(path.to_path_buf());
        }
    }

    debug!("Found {} new photos under {}", found.len(), source.display());
    Ok(found)
}

fn dir_changed_since(dir: &Path, since: i64) -> bool {
    let metadata = match fs::metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Could not stat {}: {}", dir.display(), e);
            return false;
        }
    };

    let mtime = metadata.modified().map(system_time_to_epoch).unwrap_or(0);

    #[cfg(unix)]
    let ctime = {
        use std::os::unix::fs::MetadataExt;
        metadata.ctime()
    };
    #[cfg(not(unix))]
    let ctime = 0;

    mtime >= since || ctime >= since
}

/// Copies new photos from a source directory into staging
pub struct PhotoCollector {
    status_dir: PathBuf,
    filter: SourceFilter,
    copier: Box<dyn FileCopier>,
    events: EventSender,
}

impl PhotoCollector {
    pub fn new(status_dir: impl Into<PathBuf>) -> Self {
        Self {
            status_dir: status_dir.into(),
            filter: SourceFilter::default(),
            copier: Box::new(PreservingCopier),
            events: null_sender(),
        }
    }

    /// `<local data dir>/photo-archiver`, if the platform has one
    pub fn default_status_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join(STATUS_DIR_NAME))
    }

    /// The user's picture folder, the usual collection source
    pub fn default_source_dir() -> Option<PathBuf> {
        dirs::picture_dir()
    }

    pub fn filter(mut self, filter: SourceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Copy everything new under `source` into `staging`, then record the run
    pub fn collect(&self, source: &Path, staging: &Path) -> Result<CollectReport> {
        let timer = Instant::now();
        let started_at = system_time_to_epoch(SystemTime::now());

        let mut status = CollectionStatus::load(&self.status_dir)?;
        let since = status.last_collection(source);
        info!(
            "Collecting photos from {} into {}, last collection at {}",
            source.display(),
            staging.display(),
            since
        );
        self.events.send(Event::Collect(CollectEvent::Started {
            source: source.to_path_buf(),
            since,
        }));

        let candidates = find_new_photos(source, since, &self.filter)?;
        info!("Found {} new photos", candidates.len());

        fs::create_dir_all(staging).map_err(|source| CollectError::Copy {
            path: staging.to_path_buf(),
            source,
        })?;

        let mut collected = Vec::with_capacity(candidates.len());
        for path in &candidates {
            let destination = ArchivePathPlanner::copy_into(self.copier.as_ref(), path, staging)
                .map_err(|source| CollectError::Copy {
                    path: path.clone(),
                    source,
                })?;
            self.events.send(Event::Collect(CollectEvent::FileCollected {
                source: path.clone(),
                destination: destination.clone(),
            }));
            collected.push(destination);
        }

        status.set_last_collection(source, started_at);
        status.save()?;

        self.events.send(Event::Collect(CollectEvent::Completed {
            collected: collected.len(),
        }));

        Ok(CollectReport {
            since,
            collected,
            duration_ms: timer.elapsed().as_millis() as u64,
        })
    }
}
