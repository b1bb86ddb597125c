//! # Consistency Module
//!
//! Brings the repository back into agreement with the archive tree.
//!
//! A row whose archived file no longer exists is removed. Nothing is
//! re-derived or recovered; a later archive run treats the content as new.

use crate::core::repository::{ArchiveEntry, ContentRepository};
use crate::error::RepositoryError;
use crate::events::{null_sender, ConsistencyEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Outcome of one consistency scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Rows examined
    pub checked: usize,
    /// Rows removed because their file was missing
    pub removed: Vec<ArchiveEntry>,
}

/// Prunes rows whose archive file vanished
pub struct ConsistencyScanner<'r> {
    repository: &'r ContentRepository,
    events: EventSender,
}

impl<'r> ConsistencyScanner<'r> {
    pub fn new(repository: &'r ContentRepository) -> Self {
        Self {
            repository,
            events: null_sender(),
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    /// Check every row and remove, in one bulk delete, those whose file is gone
    pub fn scan_missing(&self) -> Result<ConsistencyReport, RepositoryError> {
        self.events.send(Event::Consistency(ConsistencyEvent::Started));

        let mut report = ConsistencyReport::default();
        for entry in self.repository.iter_all_photos() {
            let entry = entry?;
            report.checked += 1;

            if !entry.archive_path.exists() {
                warn!(
                    "Archived file {} is missing, removing it from the database",
                    entry.archive_path.display()
                );
                self.events
                    .send(Event::Consistency(ConsistencyEvent::MissingFile {
                        id: entry.id,
                        path: entry.archive_path.clone(),
                    }));
                report.removed.push(entry);
            }
        }

        let ids: Vec<i64> = report.removed.iter().map(|e| e.id).collect();
        self.repository.remove_photos(&ids)?;

        info!(
            "Checked {} archived photos, {} missing",
            report.checked,
            report.removed.len()
        );
        self.events
            .send(Event::Consistency(ConsistencyEvent::Completed {
                checked: report.checked,
                removed: report.removed.len(),
            }));

        Ok(report)
    }
}
