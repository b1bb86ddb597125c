//! # Error Module
//!
//! Error types for the photo archiver.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Degrade per file** - one unreadable photo never stops a run
//! - **Recovery hints** - suggest how to fix when possible

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Metadata error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Collection error: {0}")]
    Collect(#[from] CollectError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors from the archive database
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Failed to open media database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Failed to create archive directory {path}: {source}")]
    TreeSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Failed to close media database: {0}. Pending changes may be lost.")]
    CloseFailed(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(e: rusqlite::Error) -> Self {
        RepositoryError::QueryFailed(e.to_string())
    }
}

/// Errors while reading metadata or content from a single photo
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No readable EXIF data in {path}: {reason}")]
    Exif { path: PathBuf, reason: String },

    #[error("No capture date in EXIF data of {path}")]
    NoDateField { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while walking a source directory
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from incremental photo collection
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Failed to read collection status {path}: {reason}. Delete this file to start over.")]
    StatusRead { path: PathBuf, reason: String },

    #[error("Failed to write collection status {path}: {reason}")]
    StatusWrite { path: PathBuf, reason: String },

    #[error("Failed to copy {path} into staging: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ArchiveError>;
