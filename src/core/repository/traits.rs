//! Hash lookup trait definition.

use crate::error::RepositoryError;
use std::path::PathBuf;

/// Answers "is this content already archived, and where?"
///
/// This is the query a remote duplicate-avoidance service exposes; the
/// transport lives outside this crate.
pub trait HashLookup {
    /// Archive path of the file with `fingerprint`, if any
    fn archive_path_for(&self, fingerprint: &str) -> Result<Option<PathBuf>, RepositoryError>;

    /// Whether content with `fingerprint` is already archived
    fn contains(&self, fingerprint: &str) -> Result<bool, RepositoryError> {
        Ok(self.archive_path_for(fingerprint)?.is_some())
    }
}
