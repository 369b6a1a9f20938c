//! Query methods for directories and listings

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;

use super::{format_datetime, parse_datetime, Store, StoreError};
use crate::core::entity::ListingStatus;
use crate::core::identity::{RecordId, RecordPrefix};
use crate::entities::{Directory, Listing, ListingData, NewDirectory, NewListing};
use crate::schema::SchemaModel;

const DIRECTORY_COLUMNS: &str = "id, name, description, domain, schema, created_by, created";
const LISTING_COLUMNS: &str = "id, directory_id, data, status, created";

/// Raw directory row, decoded outside the rusqlite closure
struct DirectoryRow {
    id: String,
    name: String,
    description: String,
    domain: String,
    schema: String,
    created_by: String,
    created: String,
}

impl DirectoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            domain: row.get(3)?,
            schema: row.get(4)?,
            created_by: row.get(5)?,
            created: row.get(6)?,
        })
    }

    fn decode(self) -> Result<Directory, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt {
            kind: "directory",
            id: self.id.clone(),
            message,
        };
        let id = RecordId::parse_as(&self.id, RecordPrefix::Dir)
            .map_err(|e| corrupt(e.to_string()))?;
        let document: Value =
            serde_json::from_str(&self.schema).map_err(|e| corrupt(e.to_string()))?;
        let schema = SchemaModel::parse(&document).map_err(|e| corrupt(e.to_string()))?;
        Ok(Directory {
            id,
            schema,
            created: parse_datetime(&self.created),
            name: self.name,
            description: self.description,
            domain: self.domain,
            created_by: self.created_by,
        })
    }
}

/// Raw listing row
struct ListingRow {
    id: String,
    directory_id: String,
    data: String,
    status: String,
    created: String,
}

impl ListingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            directory_id: row.get(1)?,
            data: row.get(2)?,
            status: row.get(3)?,
            created: row.get(4)?,
        })
    }

    fn decode(self) -> Result<Listing, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt {
            kind: "listing",
            id: self.id.clone(),
            message,
        };
        let id =
            RecordId::parse_as(&self.id, RecordPrefix::Lst).map_err(|e| corrupt(e.to_string()))?;
        let directory_id = RecordId::parse_as(&self.directory_id, RecordPrefix::Dir)
            .map_err(|e| corrupt(e.to_string()))?;
        let data: ListingData = serde_json::from_str(&self.data).map_err(|e| corrupt(e.to_string()))?;
        let status: ListingStatus = self.status.parse().map_err(corrupt)?;
        Ok(Listing {
            id,
            directory_id,
            data,
            status,
            created: parse_datetime(&self.created),
        })
    }
}

impl Store {
    /// Insert a directory and return its new id
    pub fn insert_directory(&mut self, directory: &NewDirectory) -> Result<RecordId, StoreError> {
        let id = RecordId::new(RecordPrefix::Dir);
        let schema = directory.schema.to_document().to_string();
        self.conn.execute(
            "INSERT INTO directories (id, name, description, domain, schema, created_by, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                directory.name,
                directory.description,
                directory.domain,
                schema,
                directory.created_by,
                format_datetime(&Utc::now()),
            ],
        )?;
        tracing::debug!(id = %id, name = %directory.name, "created directory");
        Ok(id)
    }

    /// Get a directory by id
    pub fn get_directory(&self, id: &RecordId) -> Result<Option<Directory>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM directories WHERE id = ?1", DIRECTORY_COLUMNS),
                params![id.to_string()],
                DirectoryRow::from_row,
            )
            .optional()?;
        row.map(DirectoryRow::decode).transpose()
    }

    /// All directories, newest first
    pub fn list_directories(&self) -> Result<Vec<Directory>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM directories ORDER BY created DESC, rowid DESC",
            DIRECTORY_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], DirectoryRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        tracing::debug!(count = rows.len(), "listed directories");
        rows.into_iter().map(DirectoryRow::decode).collect()
    }

    /// Replace a directory's schema wholesale
    pub fn replace_schema(&mut self, id: &RecordId, schema: &SchemaModel) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE directories SET schema = ?1 WHERE id = ?2",
            params![schema.to_document().to_string(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "directory",
                id: id.to_string(),
            });
        }
        tracing::debug!(id = %id, fields = schema.len(), "replaced directory schema");
        Ok(())
    }

    /// Insert a listing into an existing directory
    pub fn insert_listing(&mut self, listing: &NewListing) -> Result<RecordId, StoreError> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM directories WHERE id = ?1",
                params![listing.directory_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound {
                kind: "directory",
                id: listing.directory_id.to_string(),
            });
        }

        let id = RecordId::new(RecordPrefix::Lst);
        self.conn.execute(
            "INSERT INTO listings (id, directory_id, data, status, created)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                listing.directory_id.to_string(),
                Value::Object(listing.data.clone()).to_string(),
                listing.status.as_str(),
                format_datetime(&Utc::now()),
            ],
        )?;
        tracing::debug!(id = %id, directory = %listing.directory_id, status = %listing.status, "created listing");
        Ok(id)
    }

    /// Get a listing by id
    pub fn get_listing(&self, id: &RecordId) -> Result<Option<Listing>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM listings WHERE id = ?1", LISTING_COLUMNS),
                params![id.to_string()],
                ListingRow::from_row,
            )
            .optional()?;
        row.map(ListingRow::decode).transpose()
    }

    /// Listings of a directory, newest first, optionally with one status
    pub fn listings_for(
        &self,
        directory_id: &RecordId,
        status: Option<ListingStatus>,
    ) -> Result<Vec<Listing>, StoreError> {
        let rows = match status {
            Some(status) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM listings WHERE directory_id = ?1 AND status = ?2
                     ORDER BY created DESC, rowid DESC",
                    LISTING_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(
                        params![directory_id.to_string(), status.as_str()],
                        ListingRow::from_row,
                    )?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM listings WHERE directory_id = ?1
                     ORDER BY created DESC, rowid DESC",
                    LISTING_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![directory_id.to_string()], ListingRow::from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        tracing::debug!(directory = %directory_id, ?status, count = rows.len(), "listed listings");
        rows.into_iter().map(ListingRow::decode).collect()
    }

    /// Number of listings in a directory, any status
    pub fn count_listings(&self, directory_id: &RecordId) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM listings WHERE directory_id = ?1",
            params![directory_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as usize)
    }

    /// Set a listing's moderation status
    pub fn set_listing_status(
        &mut self,
        id: &RecordId,
        status: ListingStatus,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE listings SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "listing",
                id: id.to_string(),
            });
        }
        tracing::debug!(id = %id, status = %status, "updated listing status");
        Ok(())
    }
}
