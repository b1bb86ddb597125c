//! Destination planning for archived photos.

use super::copier::FileCopier;
use crate::core::photo::Photo;
use crate::core::repository::PHOTOS_DIR;
use crate::error::ExtractionError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Works out where a photo belongs under `<base>/photos/`
#[derive(Debug, Clone)]
pub struct ArchivePathPlanner {
    photos_root: PathBuf,
}

impl ArchivePathPlanner {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            photos_root: base_dir.join(PHOTOS_DIR),
        }
    }

    /// `<YYYY>/<MM>_<MonthName>` for a capture year and month
    pub fn month_folder(year: i32, month: u32) -> PathBuf {
        let name = month
            .checked_sub(1)
            .and_then(|i| MONTH_NAMES.get(i as usize))
            .copied()
            .unwrap_or("Unknown");
        PathBuf::from(format!("{:04}", year)).join(format!("{:02}_{}", month, name))
    }

    /// Canonical location relative to the photo root, before collision checks
    pub fn relative_path(photo: &mut Photo) -> Result<PathBuf, ExtractionError> {
        let (year, month, basename) = photo.path_parts()?;
        Ok(Self::month_folder(year, month).join(basename))
    }

    /// Destination directory for `photo`, created if missing
    pub fn plan(&self, photo: &mut Photo) -> Result<PathBuf, PlanError> {
        let (year, month, _) = photo.path_parts()?;
        let dir = self.photos_root.join(Self::month_folder(year, month));
        fs::create_dir_all(&dir).map_err(|source| PlanError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// First path in `dir` for `filename` that isn't taken.
    ///
    /// The name is used as is when free, otherwise `name_1.ext`,
    /// `name_2.ext`, ... until one is.
    pub fn resolve_collision(dir: &Path, filename: &str) -> PathBuf {
        let candidate = dir.join(filename);
        if !candidate.exists() {
            return candidate;
        }

        let original = Path::new(filename);
        let stem = original
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let ext = original.extension().and_then(|e| e.to_str());

        let mut counter = 1usize;
        loop {
            let new_name = match ext {
                Some(ext) => format!("{}_{}.{}", stem, counter, ext),
                None => format!("{}_{}", stem, counter),
            };
            let new_path = dir.join(new_name);
            if !new_path.exists() {
                return new_path;
            }
            counter += 1;
        }
    }

    /// Copy `source` into `dir` under a collision-free name; returns the destination.
    pub fn copy_into(
        copier: &dyn FileCopier,
        source: &Path,
        dir: &Path,
    ) -> io::Result<PathBuf> {
        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "source has no file name")
            })?;

        let destination = Self::resolve_collision(dir, &filename);
        if destination != dir.join(&filename) {
            info!(
                "{} had to be renamed to {} to avoid a conflict",
                source.display(),
                destination.display()
            );
        }

        copier.copy(source, &destination)?;
        Ok(destination)
    }
}

/// Why a destination could not be planned
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Metadata(#[from] ExtractionError),

    #[error("Failed to create archive folder {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archive::copier::PreservingCopier;
    use crate::core::metadata::PhotoMetadata;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn photo_taken(year: i32, month: u32, path: &str) -> Photo {
        let timestamp = Local
            .with_ymd_and_hms(year, month, 15, 12, 0, 0)
            .unwrap()
            .timestamp();
        Photo::with_metadata(
            path,
            PhotoMetadata {
                timestamp,
                camera_make: None,
                camera_model: None,
                size: 0,
                fingerprint: String::new(),
            },
        )
    }

    #[test]
    fn month_folder_format() {
        assert_eq!(
            ArchivePathPlanner::month_folder(2012, 7),
            PathBuf::from("2012/07_July")
        );
        assert_eq!(
            ArchivePathPlanner::month_folder(2002, 10),
            PathBuf::from("2002/10_October")
        );
    }

    #[test]
    fn relative_path_uses_capture_month_and_basename() {
        let mut photo = photo_taken(2006, 3, "/camera/DCIM/IMG_1427.JPG");
        assert_eq!(
            ArchivePathPlanner::relative_path(&mut photo).unwrap(),
            PathBuf::from("2006/03_March/IMG_1427.JPG")
        );
    }

    #[test]
    fn plan_creates_directory_lazily_and_idempotently() {
        let temp_dir = TempDir::new().unwrap();
        let planner = ArchivePathPlanner::new(temp_dir.path());
        let mut photo = photo_taken(2003, 3, "/src/594-9436_IMG.JPG");

        let first = planner.plan(&mut photo).unwrap();
        let second = planner.plan(&mut photo).unwrap();

        assert_eq!(first, temp_dir.path().join("photos/2003/03_March"));
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn free_name_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let path = ArchivePathPlanner::resolve_collision(temp_dir.path(), "foo.txt");
        assert_eq!(path, temp_dir.path().join("foo.txt"));
    }

    #[test]
    fn collision_skips_taken_suffixes() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("foo.txt"), b"a").unwrap();
        fs::write(temp_dir.path().join("foo_1.txt"), b"b").unwrap();

        let path = ArchivePathPlanner::resolve_collision(temp_dir.path(), "foo.txt");
        assert_eq!(path, temp_dir.path().join("foo_2.txt"));
    }

    #[test]
    fn collision_without_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("README"), b"a").unwrap();

        let path = ArchivePathPlanner::resolve_collision(temp_dir.path(), "README");
        assert_eq!(path, temp_dir.path().join("README_1"));
    }

    #[test]
    fn copy_into_never_overwrites() {
        let temp_src = TempDir::new().unwrap();
        let temp_dest = TempDir::new().unwrap();
        let existing = temp_dest.path().join("foo.txt");
        fs::write(&existing, b"already here").unwrap();
        let source = temp_src.path().join("foo.txt");
        fs::write(&source, b"new content").unwrap();

        let destination =
            ArchivePathPlanner::copy_into(&PreservingCopier, &source, temp_dest.path()).unwrap();

        assert_eq!(destination, temp_dest.path().join("foo_1.txt"));
        assert_eq!(fs::read(&existing).unwrap(), b"already here");
        assert_eq!(fs::read(&destination).unwrap(), b"new content");
    }
}
