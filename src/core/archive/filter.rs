//! Decides which files in a source tree are archive candidates.

use std::collections::HashSet;
use std::path::Path;

/// Extensions that never hold photos: desktop settings and SQLite files,
/// including the archive's own database and its journals.
const IGNORED_EXTENSIONS: [&str; 5] = ["ini", "db", "db-journal", "db-wal", "db-shm"];

/// Filters walked files before they are fingerprinted
#[derive(Debug, Clone)]
pub struct SourceFilter {
    /// Lowercased extensions to skip
    ignored: HashSet<String>,
    include_hidden: bool,
}

impl SourceFilter {
    pub fn new() -> Self {
        Self {
            ignored: IGNORED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            include_hidden: true,
        }
    }

    /// Include dot-files
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Replace the ignored extensions
    pub fn with_ignored_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn should_include(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return true;
        };

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => !self.ignored.contains(&ext.to_lowercase()),
            None => true,
        }
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::new()
    }
}
