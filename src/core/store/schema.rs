//! Database schema initialization

use rusqlite::{params, OptionalExtension};

use super::{Store, StoreError, SCHEMA_VERSION};

impl Store {
    /// Create tables on first use and refuse databases from another version
    pub(super) fn init_schema(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Directories; schema is the JSON document, key order preserved
            CREATE TABLE IF NOT EXISTS directories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                domain TEXT NOT NULL DEFAULT '',
                schema TEXT NOT NULL,
                created_by TEXT NOT NULL,
                created TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_directories_created ON directories(created);

            -- Listings; data is a JSON object of field values
            CREATE TABLE IF NOT EXISTS listings (
                id TEXT PRIMARY KEY,
                directory_id TEXT NOT NULL,
                data TEXT NOT NULL,
                status TEXT NOT NULL,
                created TEXT NOT NULL,
                FOREIGN KEY (directory_id) REFERENCES directories(id)
            );
            CREATE INDEX IF NOT EXISTS idx_listings_directory ON listings(directory_id);
            CREATE INDEX IF NOT EXISTS idx_listings_status ON listings(status);
            "#,
        )?;

        let found: Option<i32> = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match found {
            None => {
                self.conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
                Ok(())
            }
            Some(version) if version == SCHEMA_VERSION => Ok(()),
            Some(version) => Err(StoreError::VersionMismatch {
                found: version,
                expected: SCHEMA_VERSION,
            }),
        }
    }
}
