//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the archiver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Archive pass events
    Archive(ArchiveEvent),
    /// Consistency scan events
    Consistency(ConsistencyEvent),
    /// Staging collection events
    Collect(CollectEvent),
}

/// Events during an archive pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArchiveEvent {
    /// Walking the source directory has started
    Started { source: PathBuf },
    /// A new photo was copied into the archive
    FileArchived {
        source: PathBuf,
        destination: PathBuf,
    },
    /// A photo whose archive copy had vanished was archived again
    Reclaimed {
        source: PathBuf,
        destination: PathBuf,
    },
    /// The scanned file is the archive copy itself
    AlreadyArchived { path: PathBuf },
    /// The scanned file duplicates content already in the archive
    DuplicateFound {
        source: PathBuf,
        archived_at: PathBuf,
    },
    /// The copy did not hash to the source fingerprint
    VerificationFailed {
        source: PathBuf,
        destination: PathBuf,
    },
    /// A file or entry was not archived
    Skipped { path: PathBuf, reason: String },
    /// A source file was removed after the walk finished
    SourceDeleted { path: PathBuf },
    /// The archive pass finished
    Completed { files_seen: usize, archived: usize },
}

/// Events during a consistency scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConsistencyEvent {
    /// The scan has started
    Started,
    /// An archived file recorded in the database is gone
    MissingFile { id: i64, path: PathBuf },
    /// The scan finished
    Completed { checked: usize, removed: usize },
}

/// Events while collecting photos into a staging directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CollectEvent {
    /// Collection has started
    Started { source: PathBuf, since: i64 },
    /// A photo was copied into staging
    FileCollected {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Collection finished
    Completed { collected: usize },
}

impl std::fmt::Display for ArchiveEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveEvent::Started { source } => write!(f, "Scanning {}", source.display()),
            ArchiveEvent::FileArchived { destination, .. } => {
                write!(f, "Archived {}", destination.display())
            }
            ArchiveEvent::Reclaimed { destination, .. } => {
                write!(f, "Re-archived {}", destination.display())
            }
            ArchiveEvent::AlreadyArchived { path } => {
                write!(f, "Already archived {}", path.display())
            }
            ArchiveEvent::DuplicateFound { source, .. } => {
                write!(f, "Duplicate {}", source.display())
            }
            ArchiveEvent::VerificationFailed { source, .. } => {
                write!(f, "Copy verification failed for {}", source.display())
            }
            ArchiveEvent::Skipped { path, .. } => write!(f, "Skipped {}", path.display()),
            ArchiveEvent::SourceDeleted { path } => write!(f, "Deleted {}", path.display()),
            ArchiveEvent::Completed { files_seen, .. } => {
                write!(f, "Finished {} files", files_seen)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Archive(ArchiveEvent::FileArchived {
            source: PathBuf::from("/src/a.jpg"),
            destination: PathBuf::from("/media/photos/2012/07_July/a.jpg"),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("FileArchived"));
        assert!(json.contains("07_July"));
    }

    #[test]
    fn archive_event_display_names_the_file() {
        let event = ArchiveEvent::DuplicateFound {
            source: PathBuf::from("/src/dup_a.jpg"),
            archived_at: PathBuf::from("/media/photos/2012/07_July/a.jpg"),
        };
        assert_eq!(event.to_string(), "Duplicate /src/dup_a.jpg");
    }
}
