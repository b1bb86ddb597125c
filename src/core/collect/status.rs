//! Persisted time of the last collection per source directory.

use crate::error::CollectError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const STATUS_FILE: &str = "status.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StatusFile {
    /// Canonical source directory -> epoch seconds
    #[serde(default)]
    last_collection: BTreeMap<String, i64>,
}

/// `status.json` in a status directory
#[derive(Debug, Clone)]
pub struct CollectionStatus {
    path: PathBuf,
    state: StatusFile,
}

impl CollectionStatus {
    /// Read the status in `status_dir`; a missing file is an empty status.
    ///
    /// A file that can't be parsed is logged and replaced on the next save.
    pub fn load(status_dir: &Path) -> Result<Self, CollectError> {
        let path = status_dir.join(STATUS_FILE);

        let state = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "Could not parse collection status {}: {}, continuing without it",
                        path.display(),
                        e
                    );
                    StatusFile::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No collection status at {}", path.display());
                StatusFile::default()
            }
            Err(e) => {
                return Err(CollectError::StatusRead {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        Ok(Self { path, state })
    }

    /// Epoch second `source` was last collected, 0 if never
    pub fn last_collection(&self, source: &Path) -> i64 {
        self.state
            .last_collection
            .get(&status_key(source))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_last_collection(&mut self, source: &Path, time: i64) {
        self.state.last_collection.insert(status_key(source), time);
    }

    pub fn save(&self) -> Result<(), CollectError> {
        let write_failed = |reason: String| CollectError::StatusWrite {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }
        let contents =
            serde_json::to_string_pretty(&self.state).map_err(|e| write_failed(e.to_string()))?;
        fs::write(&self.path, contents).map_err(|e| write_failed(e.to_string()))
    }
}

/// Sources are keyed by their resolved path so `./pics` and `/home/me/pics` agree
fn status_key(source: &Path) -> String {
    fs::canonicalize(source)
        .unwrap_or_else(|_| source.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
