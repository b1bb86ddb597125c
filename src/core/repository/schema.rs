//! Table layout and upsert policy for a repository.

/// Column an upsert matches existing rows on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColumn {
    Fingerprint,
    ArchivePath,
}

impl KeyColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyColumn::Fingerprint => "fingerprint",
            KeyColumn::ArchivePath => "archive_path",
        }
    }
}

/// A user-editable column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Flags,
    Description,
    SourceInfo,
}

impl Annotation {
    pub const ALL: [Annotation; 3] = [
        Annotation::Flags,
        Annotation::Description,
        Annotation::SourceInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Annotation::Flags => "flags",
            Annotation::Description => "description",
            Annotation::SourceInfo => "source_info",
        }
    }
}

/// Where a repository stores its rows and what an upsert keeps.
///
/// One repository implementation serves every layout; a layout differs only
/// in file, table, key and preserved annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Database file name inside the archive root
    pub db_name: &'static str,
    pub table: &'static str,
    pub key: KeyColumn,
    /// Annotations an upsert keeps from the existing row
    pub preserved: &'static [Annotation],
}

impl TableSchema {
    /// The archive layout: `media.db`, keyed by content fingerprint
    pub const fn photos() -> Self {
        Self {
            db_name: "media.db",
            table: "photos",
            key: KeyColumn::Fingerprint,
            preserved: &Annotation::ALL,
        }
    }

    pub fn preserves(&self, annotation: Annotation) -> bool {
        self.preserved.contains(&annotation)
    }

    pub(crate) fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                flags TEXT,
                fingerprint TEXT,
                size INTEGER,
                description TEXT,
                source_info TEXT,
                archive_path TEXT,
                timestamp INTEGER,
                camera_make TEXT,
                camera_model TEXT,
                UNIQUE ({key}) ON CONFLICT REPLACE
            )",
            table = self.table,
            key = self.key.as_str(),
        )
    }

    /// Insert-or-replace keyed on `key`, taking the old id and the preserved
    /// annotations from the matched row when there is one.
    pub(crate) fn upsert_sql(&self) -> String {
        let annotation = |a: Annotation| {
            let column = a.as_str();
            if self.preserves(a) {
                format!("CASE WHEN old.id IS NULL THEN new.{column} ELSE old.{column} END")
            } else {
                format!("new.{column}")
            }
        };

        format!(
            "INSERT OR REPLACE INTO {table}
                (id, flags, fingerprint, size, description, source_info,
                 camera_make, camera_model, archive_path, timestamp)
             SELECT old.id, {flags}, new.fingerprint, new.size, {description},
                    {source_info}, new.camera_make, new.camera_model,
                    new.archive_path, new.timestamp
             FROM (SELECT
                 :fingerprint  AS fingerprint,
                 :size         AS size,
                 :flags        AS flags,
                 :description  AS description,
                 :source_info  AS source_info,
                 :camera_make  AS camera_make,
                 :camera_model AS camera_model,
                 :archive_path AS archive_path,
                 :timestamp    AS timestamp
             ) AS new
             LEFT JOIN (
                 SELECT id, flags, description, source_info, {key} FROM {table}
             ) AS old ON new.{key} = old.{key}",
            table = self.table,
            key = self.key.as_str(),
            flags = annotation(Annotation::Flags),
            description = annotation(Annotation::Description),
            source_info = annotation(Annotation::SourceInfo),
        )
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::photos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photos_schema_preserves_all_annotations() {
        let schema = TableSchema::photos();
        assert_eq!(schema.db_name, "media.db");
        assert!(Annotation::ALL.iter().all(|a| schema.preserves(*a)));
    }

    #[test]
    fn unique_constraint_follows_key() {
        let schema = TableSchema {
            key: KeyColumn::ArchivePath,
            ..TableSchema::photos()
        };
        assert!(schema
            .create_table_sql()
            .contains("UNIQUE (archive_path) ON CONFLICT REPLACE"));
    }

    #[test]
    fn unpreserved_annotation_takes_new_value() {
        let schema = TableSchema {
            preserved: &[Annotation::Flags],
            ..TableSchema::photos()
        };
        let sql = schema.upsert_sql();
        assert!(sql.contains("ELSE old.flags END"));
        assert!(sql.contains("new.description,"));
    }
}
