//! # Archive Module
//!
//! Copies photos into the date-organized archive tree.
//!
//! ## Layout
//! ```text
//! <media>/
//! ├── media.db
//! └── photos/
//!     └── 2012/
//!         └── 08_August/
//!             ├── IMG_1427.JPG
//!             └── IMG_1427_1.JPG
//! ```
//!
//! ## Safety
//! - Nothing in the archive is ever overwritten; name clashes get a `_<n>` suffix
//! - Every copy is re-fingerprinted before its source may be deleted
//! - Sources are deleted only after the whole walk has finished

mod copier;
mod filter;
mod orchestrator;
mod planner;

pub use copier::{FileCopier, PreservingCopier};
pub use filter::SourceFilter;
pub use orchestrator::{ArchiveOptions, ArchiveOrchestrator, ArchiveReport};
pub use planner::{ArchivePathPlanner, PlanError};
