//! # Repository Module
//!
//! Maps content fingerprints to archived files.
//!
//! ## Guarantees
//! - At most one row per key (the fingerprint, for the archive schema)
//! - Upserts keep the row id and the user-editable annotations
//! - Every mutation is its own committed transaction
//!
//! ## Backends
//! - `ContentRepository` - a single SQLite file at the archive root

mod schema;
mod sqlite;
mod traits;

pub use schema::{Annotation, KeyColumn, TableSchema};
pub use sqlite::{AllPhotos, ContentRepository};
pub use traits::HashLookup;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sub-directory of the archive root that holds the photo tree
pub const PHOTOS_DIR: &str = "photos";

/// A persisted archive row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Row id, assigned by the database
    pub id: Option<i64>,
    pub fingerprint: String,
    /// Size in bytes
    pub size: u64,
    pub description: Option<String>,
    pub source_info: Option<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    /// Full path of the archived copy
    pub archive_path: PathBuf,
    /// Capture time, Unix epoch seconds
    pub timestamp: i64,
    /// Free-form user tags
    pub flags: Option<String>,
}

/// The `(id, archive_path)` pair returned by lookups and iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub id: i64,
    pub archive_path: PathBuf,
}

/// User-editable fields of a row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    pub flags: Option<String>,
    pub description: Option<String>,
    pub source_info: Option<String>,
}
