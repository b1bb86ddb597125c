//! # Core Module
//!
//! The content-addressable archival engine.
//!
//! ## Modules
//! - `metadata` - Capture time, camera and fingerprint of a file
//! - `photo` - A scanned file with lazily loaded metadata
//! - `repository` - The fingerprint-keyed database
//! - `archive` - Path planning and the scan-and-archive workflow
//! - `consistency` - Prunes rows whose archived file vanished
//! - `collect` - Incremental collection into a staging directory

pub mod archive;
pub mod collect;
pub mod consistency;
pub mod metadata;
pub mod photo;
pub mod repository;

// Re-export commonly used types
pub use archive::{ArchiveOptions, ArchiveOrchestrator, ArchivePathPlanner, ArchiveReport};
pub use consistency::{ConsistencyReport, ConsistencyScanner};
pub use metadata::PhotoMetadata;
pub use photo::Photo;
pub use repository::{ContentRepository, PhotoRecord};
