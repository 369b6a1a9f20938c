//! SQLite-backed record store for directories and listings
//!
//! Plays the persistence collaborator: equality and ordering queries only.
//! Schema documents and listing data are kept as JSON text so field order
//! survives a round trip. The store never drops data; a database written by
//! a different schema version is refused rather than rebuilt.

mod queries;
mod schema;

use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use miette::Diagnostic;
use rusqlite::Connection;
use thiserror::Error;

use crate::core::entity::ListingStatus;
use crate::core::identity::RecordId;
use crate::core::project::Project;
use crate::core::services::{DirectoryStore, ExternalCallError, ListingStore};
use crate::entities::{Directory, Listing, NewDirectory, NewListing};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Errors from the record store
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("Database error: {0}")]
    #[diagnostic(code(tdk::store::sqlite))]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store schema version {found} is not supported (expected {expected})")]
    #[diagnostic(
        code(tdk::store::version),
        help("This store was written by another version of tdk")
    )]
    VersionMismatch { found: i32, expected: i32 },

    #[error("No {kind} found with id {id}")]
    #[diagnostic(code(tdk::store::not_found))]
    NotFound { kind: &'static str, id: String },

    #[error("Stored {kind} {id} is unreadable: {message}")]
    #[diagnostic(code(tdk::store::corrupt))]
    Corrupt {
        kind: &'static str,
        id: String,
        message: String,
    },

    #[error("IO error: {0}")]
    #[diagnostic(code(tdk::store::io))]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for ExternalCallError {
    fn from(err: StoreError) -> Self {
        ExternalCallError::new(err.to_string())
    }
}

/// The record store backed by SQLite
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the store of a project
    pub fn open(project: &Project) -> Result<Self, StoreError> {
        Self::open_at(&project.store_path())
    }

    /// Open or create a store at an explicit path
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let mut store = Self { conn };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), "opened record store");
        Ok(store)
    }

    /// Store that lives only as long as the value
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }
}

impl DirectoryStore for Store {
    fn create_directory(&mut self, directory: &NewDirectory) -> Result<RecordId, ExternalCallError> {
        Ok(self.insert_directory(directory)?)
    }

    fn fetch_directory(&self, id: &RecordId) -> Result<Option<Directory>, ExternalCallError> {
        Ok(self.get_directory(id)?)
    }
}

impl ListingStore for Store {
    fn create_listing(&mut self, listing: &NewListing) -> Result<RecordId, ExternalCallError> {
        Ok(self.insert_listing(listing)?)
    }

    fn list_listings(
        &self,
        directory_id: &RecordId,
        status: Option<ListingStatus>,
    ) -> Result<Vec<Listing>, ExternalCallError> {
        Ok(self.listings_for(directory_id, status)?)
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so text order is time order
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse datetime string to DateTime<Utc>
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::RecordPrefix;
    use crate::schema::SchemaModel;
    use serde_json::{json, Map, Value};

    fn schema() -> SchemaModel {
        SchemaModel::parse(&json!({
            "properties": {
                "name": {"type": "string", "title": "Name"},
                "website": {"type": "url"},
                "focusAreas": {"type": "string", "title": "Focus Areas"}
            },
            "required": ["name"]
        }))
        .unwrap()
    }

    fn new_directory(name: &str) -> NewDirectory {
        NewDirectory {
            name: name.to_string(),
            description: "Organizations".into(),
            domain: "climate".into(),
            schema: schema(),
            created_by: "ops".into(),
        }
    }

    fn data(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_directory_round_trip_keeps_field_order() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.create_directory(&new_directory("Climate")).unwrap();
        assert_eq!(id.prefix(), RecordPrefix::Dir);

        let dir = store.fetch_directory(&id).unwrap().unwrap();
        assert_eq!(dir.name, "Climate");
        assert_eq!(dir.domain, "climate");
        assert_eq!(dir.created_by, "ops");
        assert_eq!(dir.schema.field_order(), vec!["name", "website", "focusAreas"]);
        assert_eq!(dir.schema.required(), &["name".to_string()]);
    }

    #[test]
    fn test_fetch_missing_directory() {
        let store = Store::open_in_memory().unwrap();
        let missing = RecordId::new(RecordPrefix::Dir);
        assert!(store.fetch_directory(&missing).unwrap().is_none());
    }

    #[test]
    fn test_list_directories_newest_first() {
        let mut store = Store::open_in_memory().unwrap();
        store.create_directory(&new_directory("First")).unwrap();
        store.create_directory(&new_directory("Second")).unwrap();
        let names: Vec<String> = store
            .list_directories()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Second", "First"]);
    }

    #[test]
    fn test_listings_by_directory_and_status() {
        let mut store = Store::open_in_memory().unwrap();
        let dir = store.create_directory(&new_directory("Climate")).unwrap();
        let other = store.create_directory(&new_directory("Other")).unwrap();

        for (name, status) in [
            ("Acme", ListingStatus::Approved),
            ("Beta", ListingStatus::Pending),
            ("Gamma", ListingStatus::Approved),
        ] {
            store
                .create_listing(&NewListing {
                    directory_id: dir.clone(),
                    data: data(json!({"name": name, "focusAreas": "Health"})),
                    status,
                })
                .unwrap();
        }
        store
            .create_listing(&NewListing {
                directory_id: other.clone(),
                data: data(json!({"name": "Elsewhere"})),
                status: ListingStatus::Approved,
            })
            .unwrap();

        let all = store.list_listings(&dir, None).unwrap();
        let names: Vec<String> = all.iter().map(|l| l.display("name")).collect();
        assert_eq!(names, vec!["Gamma", "Beta", "Acme"]);

        let approved = store
            .list_listings(&dir, Some(ListingStatus::Approved))
            .unwrap();
        assert_eq!(approved.len(), 2);
        assert!(approved.iter().all(|l| l.directory_id == dir));
        assert_eq!(store.count_listings(&dir).unwrap(), 3);
    }

    #[test]
    fn test_listing_data_preserved() {
        let mut store = Store::open_in_memory().unwrap();
        let dir = store.create_directory(&new_directory("Climate")).unwrap();
        let id = store
            .create_listing(&NewListing {
                directory_id: dir,
                data: data(json!({"zeta": "1", "alpha": true, "legacy": ["a", "b"]})),
                status: ListingStatus::Pending,
            })
            .unwrap();

        let listing = store.get_listing(&id).unwrap().unwrap();
        let keys: Vec<&str> = listing.data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "legacy"]);
        assert_eq!(listing.get("alpha"), Some(&json!(true)));
        assert_eq!(listing.status, ListingStatus::Pending);
    }

    #[test]
    fn test_listing_for_unknown_directory_rejected() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store
            .create_listing(&NewListing {
                directory_id: RecordId::new(RecordPrefix::Dir),
                data: Map::new(),
                status: ListingStatus::Pending,
            })
            .unwrap_err();
        assert!(err.message().starts_with("No directory found"));
    }

    #[test]
    fn test_set_listing_status() {
        let mut store = Store::open_in_memory().unwrap();
        let dir = store.create_directory(&new_directory("Climate")).unwrap();
        let id = store
            .create_listing(&NewListing {
                directory_id: dir,
                data: data(json!({"name": "Acme"})),
                status: ListingStatus::Pending,
            })
            .unwrap();

        store.set_listing_status(&id, ListingStatus::Approved).unwrap();
        let listing = store.get_listing(&id).unwrap().unwrap();
        assert_eq!(listing.status, ListingStatus::Approved);

        let missing = RecordId::new(RecordPrefix::Lst);
        assert!(matches!(
            store.set_listing_status(&missing, ListingStatus::Rejected),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_replace_schema_wholesale() {
        let mut store = Store::open_in_memory().unwrap();
        let id = store.create_directory(&new_directory("Climate")).unwrap();
        let replacement =
            SchemaModel::parse(&json!({"properties": {"city": {}}, "required": ["city"]}))
                .unwrap();
        store.replace_schema(&id, &replacement).unwrap();

        let dir = store.fetch_directory(&id).unwrap().unwrap();
        assert_eq!(dir.schema.field_order(), vec!["city"]);
        assert!(dir.schema.is_required("city"));

        let missing = RecordId::new(RecordPrefix::Dir);
        assert!(store.replace_schema(&missing, &replacement).is_err());
    }

    #[test]
    fn test_reopen_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".tdk/store.db");
        let id = {
            let mut store = Store::open_at(&path).unwrap();
            store.create_directory(&new_directory("Climate")).unwrap()
        };
        let store = Store::open_at(&path).unwrap();
        assert!(store.fetch_directory(&id).unwrap().is_some());
    }

    #[test]
    fn test_version_mismatch_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.db");
        {
            let store = Store::open_at(&path).unwrap();
            store
                .conn
                .execute("UPDATE schema_version SET version = 99", [])
                .unwrap();
        }
        assert!(matches!(
            Store::open_at(&path),
            Err(StoreError::VersionMismatch { found: 99, .. })
        ));
    }
}
