//! A photo file visited during a scan.

use crate::core::metadata::{extract_metadata, local_time, PhotoMetadata};
use crate::core::repository::PhotoRecord;
use crate::error::ExtractionError;
use chrono::Datelike;
use std::path::{Path, PathBuf};

/// A source file and, once loaded, its metadata.
///
/// Lives for one scan step. Only its [`PhotoRecord`] is ever persisted.
#[derive(Debug, Clone)]
pub struct Photo {
    source_path: PathBuf,
    metadata: Option<PhotoMetadata>,
    /// Where the photo was copied to, once archived
    pub archive_path: Option<PathBuf>,
    /// Repository row id, once archived
    pub db_id: Option<i64>,
}

impl Photo {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            metadata: None,
            archive_path: None,
            db_id: None,
        }
    }

    /// Wrap a path whose metadata is already known
    pub fn with_metadata(source_path: impl Into<PathBuf>, metadata: PhotoMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::new(source_path)
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Metadata, extracted from the file on first access
    pub fn metadata(&mut self) -> Result<&PhotoMetadata, ExtractionError> {
        let metadata = match self.metadata.take() {
            Some(metadata) => metadata,
            None => extract_metadata(&self.source_path)?,
        };
        Ok(self.metadata.insert(metadata))
    }

    /// Re-read metadata from the file, replacing anything cached
    pub fn load_metadata(&mut self) -> Result<(), ExtractionError> {
        self.metadata = Some(extract_metadata(&self.source_path)?);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn fingerprint(&mut self) -> Result<&str, ExtractionError> {
        Ok(self.metadata()?.fingerprint.as_str())
    }

    /// File name without directories
    pub fn basename(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// (year, month, basename) of the capture time in local time
    pub fn path_parts(&mut self) -> Result<(i32, u32, String), ExtractionError> {
        let captured = local_time(self.metadata()?.timestamp);
        Ok((captured.year(), captured.month(), self.basename()))
    }

    /// The repository row for this photo at `archive_path`
    pub fn to_record(&mut self, archive_path: &Path) -> Result<PhotoRecord, ExtractionError> {
        let id = self.db_id;
        let metadata = self.metadata()?;
        Ok(PhotoRecord {
            id,
            fingerprint: metadata.fingerprint.clone(),
            size: metadata.size,
            description: None,
            source_info: None,
            camera_make: metadata.camera_make.clone(),
            camera_model: metadata.camera_model.clone(),
            archive_path: archive_path.to_path_buf(),
            timestamp: metadata.timestamp,
            flags: None,
        })
    }
}
