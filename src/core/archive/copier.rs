//! Byte copies into the archive.

use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::io;
use std::path::Path;

/// Copies one file to a destination path that does not exist yet
pub trait FileCopier {
    fn copy(&self, source: &Path, destination: &Path) -> io::Result<()>;
}

/// Copies content and permissions, then carries over the modification time
#[derive(Debug, Clone, Copy, Default)]
pub struct PreservingCopier;

impl FileCopier for PreservingCopier {
    fn copy(&self, source: &Path, destination: &Path) -> io::Result<()> {
        fs::copy(source, destination)?;
        let metadata = fs::metadata(source)?;
        set_file_mtime(destination, FileTime::from_last_modification_time(&metadata))
    }
}
