//! # Photo Archiver
//!
//! Copies photos into a date-organized archive and keeps a database of what
//! is already there, keyed by content.
//!
//! ## Core Philosophy
//! - **Never archive twice** - identical bytes map to one row and one file
//! - **Never overwrite** - name clashes in the archive get a numeric suffix
//! - **Verify before deleting** - a source is removed only after its copy hashes the same
//!
//! ## Architecture
//! - `core` - The archival engine
//! - `events` - Progress reporting for UI layers
//! - `error` - Error types with context

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{ArchiveError, Result};

/// Install a stderr tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when `verbose`.
/// Calling this again after a subscriber is installed does nothing.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
