//! SQLite repository backend.

use super::{Annotations, ArchiveEntry, HashLookup, PhotoRecord, TableSchema, PHOTOS_DIR};
use crate::error::RepositoryError;
use rusqlite::{named_params, params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows fetched per query while iterating the whole table
const PAGE_SIZE: usize = 256;

/// Ids bound per DELETE, below SQLite's default bind-count limit
const DELETE_CHUNK: usize = 500;

/// The archive database.
///
/// Owns the single connection to the database file for one run. Nothing
/// else is expected to write to the file meanwhile.
pub struct ContentRepository {
    conn: Connection,
    base_dir: PathBuf,
    db_path: PathBuf,
    schema: TableSchema,
    upsert_sql: String,
}

impl ContentRepository {
    /// Open the archive at `base_dir`, creating the tree and database if absent
    pub fn open(base_dir: &Path) -> Result<Self, RepositoryError> {
        Self::open_with_schema(base_dir, TableSchema::photos())
    }

    pub fn open_with_schema(base_dir: &Path, schema: TableSchema) -> Result<Self, RepositoryError> {
        Self::tree_setup(base_dir)?;

        let db_path = base_dir.join(schema.db_name);
        if !db_path.exists() {
            warn!(
                "No media database at {}, will attempt to create it",
                db_path.display()
            );
        }

        let open_failed = |e: rusqlite::Error| RepositoryError::OpenFailed {
            path: db_path.clone(),
            reason: e.to_string(),
        };

        let conn = Connection::open(&db_path).map_err(open_failed)?;

        // Also the first read of the file, so a corrupt database fails here
        conn.execute_batch(&schema.create_table_sql())
            .map_err(open_failed)?;

        info!("Opened media repository at {}", db_path.display());

        Ok(Self {
            conn,
            base_dir: base_dir.to_path_buf(),
            upsert_sql: schema.upsert_sql(),
            db_path,
            schema,
        })
    }

    /// Create the archive root and its photo tree
    fn tree_setup(base_dir: &Path) -> Result<(), RepositoryError> {
        let photos_dir = base_dir.join(PHOTOS_DIR);
        fs::create_dir_all(&photos_dir).map_err(|source| RepositoryError::TreeSetup {
            path: photos_dir,
            source,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Insert `record`, or refresh the row with the same key. Returns the row id.
    ///
    /// A refreshed row keeps its id and preserved annotations; size, camera,
    /// archive path and timestamp come from `record`.
    pub fn add_or_update(&self, record: &PhotoRecord) -> Result<i64, RepositoryError> {
        let archive_path = record.archive_path.to_string_lossy().into_owned();

        self.conn.execute(
            &self.upsert_sql,
            named_params! {
                ":fingerprint": record.fingerprint,
                ":size": record.size as i64,
                ":flags": record.flags,
                ":description": record.description,
                ":source_info": record.source_info,
                ":camera_make": record.camera_make,
                ":camera_model": record.camera_model,
                ":archive_path": archive_path,
                ":timestamp": record.timestamp,
            },
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Stored {} as row {}", record.fingerprint, id);
        Ok(id)
    }

    /// Id and archive path of the row with `fingerprint`
    pub fn lookup_hash(&self, fingerprint: &str) -> Result<Option<ArchiveEntry>, RepositoryError> {
        debug!("Looking for hash {}", fingerprint);

        let sql = format!(
            "SELECT id, archive_path FROM {} WHERE fingerprint = ?",
            self.schema.table
        );
        let entry = self
            .conn
            .query_row(&sql, [fingerprint], entry_from_row)
            .optional()?;

        Ok(entry)
    }

    /// Full row by id
    pub fn get(&self, id: i64) -> Result<Option<PhotoRecord>, RepositoryError> {
        let sql = format!(
            "SELECT id, fingerprint, size, description, source_info, camera_make,
                    camera_model, archive_path, timestamp, flags
             FROM {} WHERE id = ?",
            self.schema.table
        );

        let record = self
            .conn
            .query_row(&sql, [id], |row| {
                Ok(PhotoRecord {
                    id: row.get(0)?,
                    fingerprint: row.get(1)?,
                    size: row.get::<_, Option<i64>>(2)?.unwrap_or(0) as u64,
                    description: row.get(3)?,
                    source_info: row.get(4)?,
                    camera_make: row.get(5)?,
                    camera_model: row.get(6)?,
                    archive_path: PathBuf::from(row.get::<_, String>(7)?),
                    timestamp: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
                    flags: row.get(9)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    pub fn count(&self) -> Result<usize, RepositoryError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.schema.table);
        let count = self
            .conn
            .query_row(&sql, [], |row| row.get::<_, i64>(0).map(|v| v as usize))?;
        Ok(count)
    }

    /// Every `(id, archive_path)` pair, fetched lazily in id order.
    pub fn iter_all_photos(&self) -> AllPhotos<'_> {
        AllPhotos {
            repository: self,
            after_id: i64::MIN,
            page: VecDeque::new(),
            finished: false,
        }
    }

    fn page_after(&self, after_id: i64) -> Result<Vec<ArchiveEntry>, RepositoryError> {
        let sql = format!(
            "SELECT id, archive_path FROM {} WHERE id > ? ORDER BY id LIMIT ?",
            self.schema.table
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;

        let entries = stmt
            .query_map(params![after_id, PAGE_SIZE as i64], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Delete every row in `ids` in one transaction. Empty input is a no-op.
    pub fn remove_photos(&self, ids: &[i64]) -> Result<usize, RepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;

        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "DELETE FROM {} WHERE id IN ({})",
                self.schema.table, placeholders
            );
            removed += tx.execute(&sql, params_from_iter(chunk.iter()))?;
        }

        tx.commit()?;
        info!("Removed {} photos from the repository", removed);
        Ok(removed)
    }

    /// Delete the row with `fingerprint`
    pub fn remove(&self, fingerprint: &str) -> Result<bool, RepositoryError> {
        let sql = format!("DELETE FROM {} WHERE fingerprint = ?", self.schema.table);
        let removed = self.conn.execute(&sql, [fingerprint])?;
        Ok(removed > 0)
    }

    /// Replace the user-editable fields of row `id`
    pub fn update_annotations(
        &self,
        id: i64,
        annotations: &Annotations,
    ) -> Result<bool, RepositoryError> {
        let sql = format!(
            "UPDATE {} SET flags = ?, description = ?, source_info = ? WHERE id = ?",
            self.schema.table
        );
        let updated = self.conn.execute(
            &sql,
            params![
                annotations.flags,
                annotations.description,
                annotations.source_info,
                id,
            ],
        )?;
        Ok(updated > 0)
    }

    /// Release the connection. Every mutation is already committed.
    pub fn close(self) -> Result<(), RepositoryError> {
        let db_path = self.db_path;
        self.conn
            .close()
            .map_err(|(_, e)| RepositoryError::CloseFailed(e.to_string()))?;
        debug!("Closed media repository at {}", db_path.display());
        Ok(())
    }
}

impl HashLookup for ContentRepository {
    fn archive_path_for(&self, fingerprint: &str) -> Result<Option<PathBuf>, RepositoryError> {
        Ok(self.lookup_hash(fingerprint)?.map(|entry| entry.archive_path))
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ArchiveEntry> {
    Ok(ArchiveEntry {
        id: row.get(0)?,
        archive_path: PathBuf::from(row.get::<_, String>(1)?),
    })
}

/// Lazy pass over every row of a repository.
///
/// Pages by ascending id so rows removed mid-iteration never shift the
/// cursor. Ends after the last row, or after yielding the first error.
pub struct AllPhotos<'a> {
    repository: &'a ContentRepository,
    after_id: i64,
    page: VecDeque<ArchiveEntry>,
    finished: bool,
}

impl Iterator for AllPhotos<'_> {
    type Item = Result<ArchiveEntry, RepositoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() && !self.finished {
            match self.repository.page_after(self.after_id) {
                Ok(rows) => {
                    if rows.len() < PAGE_SIZE {
                        self.finished = true;
                    }
                    if let Some(last) = rows.last() {
                        self.after_id = last.id;
                    }
                    self.page.extend(rows);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }

        self.page.pop_front().map(Ok)
    }
}
