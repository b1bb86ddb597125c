//! # Metadata Module
//!
//! Derives everything the archive needs to know about a single file.
//!
//! ## Extracted Fields
//! - Capture time (first of DateTimeOriginal, DateTimeDigitized, DateTime)
//! - Camera make and model
//! - File size
//! - Content fingerprint (MD5 of the bytes)
//!
//! ## Fallbacks
//! EXIF is optional. A file with unreadable or dateless EXIF is dated by its
//! modification time, and by the epoch if even that is unavailable. Only a
//! file whose bytes cannot be read fails extraction, since it has no
//! fingerprint.

mod fingerprint;

pub use fingerprint::{fingerprint_file, fingerprint_reader, CHUNK_SIZE};

use crate::error::ExtractionError;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Capture-date tags, most specific first
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// EXIF date format: "YYYY:MM:DD HH:MM:SS"
const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// The fields read from a file's embedded EXIF block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifMetadata {
    /// Capture time as Unix epoch seconds
    pub date_taken: Option<i64>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
}

/// Everything the archive records about one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    /// Capture time as Unix epoch seconds
    pub timestamp: i64,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    /// File size in bytes (0 if it could not be read)
    pub size: u64,
    /// Lowercase hex MD5 of the file content
    pub fingerprint: String,
}

/// Extract metadata and fingerprint for `path`.
///
/// Never fails on missing or corrupt EXIF. Fails only if the content
/// cannot be read for fingerprinting.
pub fn extract_metadata(path: &Path) -> Result<PhotoMetadata, ExtractionError> {
    let exif = match read_exif(path) {
        Ok(exif) => Some(exif),
        Err(e) => {
            warn!("{}; dating it by the filesystem", e);
            None
        }
    };

    let timestamp = match exif.as_ref().map(|e| exif_timestamp(e, path)) {
        Some(Ok(timestamp)) => timestamp,
        Some(Err(e)) => {
            debug!("{}", e);
            filesystem_timestamp(path)
        }
        None => filesystem_timestamp(path),
    };

    let fingerprint = fingerprint_file(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (camera_make, camera_model) = match exif {
        Some(exif) => (exif.camera_make, exif.camera_model),
        None => (None, None),
    };

    Ok(PhotoMetadata {
        timestamp,
        camera_make,
        camera_model,
        size: file_size(path),
        fingerprint,
    })
}

/// Read EXIF date and camera fields from a photo
pub fn read_exif(path: &Path) -> Result<ExifMetadata, ExtractionError> {
    let file = File::open(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut bufreader = BufReader::new(&file);
    let exif_reader =
        Reader::new()
            .read_from_container(&mut bufreader)
            .map_err(|e| ExtractionError::Exif {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

    let mut metadata = ExifMetadata::default();

    for tag in DATE_TAGS {
        let Some(field) = exif_reader.get_field(tag, In::PRIMARY) else {
            continue;
        };
        match get_string_value(&field.value).as_deref().and_then(parse_exif_datetime) {
            Some(timestamp) => {
                metadata.date_taken = Some(timestamp);
                break;
            }
            None => warn!(
                "Unreadable {} timestamp in {}, trying the next date field",
                tag,
                path.display()
            ),
        }
    }

    if let Some(field) = exif_reader.get_field(Tag::Make, In::PRIMARY) {
        metadata.camera_make = get_string_value(&field.value);
    }

    if let Some(field) = exif_reader.get_field(Tag::Model, In::PRIMARY) {
        metadata.camera_model = get_string_value(&field.value);
    }

    Ok(metadata)
}

fn exif_timestamp(exif: &ExifMetadata, path: &Path) -> Result<i64, ExtractionError> {
    exif.date_taken.ok_or_else(|| ExtractionError::NoDateField {
        path: path.to_path_buf(),
    })
}

/// Parse an EXIF date string as local time into epoch seconds
pub fn parse_exif_datetime(s: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), EXIF_DATE_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Last-modified time of `path`, or the epoch with a warning
pub fn filesystem_timestamp(path: &Path) -> i64 {
    match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => system_time_to_epoch(modified),
        Err(e) => {
            warn!(
                "Could not read the timestamp of {} by any means ({}), using the epoch",
                path.display(),
                e
            );
            0
        }
    }
}

fn file_size(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            warn!("Could not read file size of {}: {}", path.display(), e);
            0
        }
    }
}

/// Seconds since the epoch, negative for times before 1970
pub fn system_time_to_epoch(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

/// Local calendar time for an epoch timestamp
pub fn local_time(timestamp: i64) -> DateTime<Local> {
    Local
        .timestamp_opt(timestamp, 0)
        .earliest()
        .unwrap_or_else(|| DateTime::<Utc>::default().with_timezone(&Local))
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}
