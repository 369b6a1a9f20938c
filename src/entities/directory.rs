//! Directory record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Record;
use crate::core::identity::RecordId;
use crate::schema::SchemaModel;

/// A directory: one schema, many listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directory {
    /// Unique identifier
    pub id: RecordId,

    /// Display name
    pub name: String,

    /// What the directory collects
    #[serde(default)]
    pub description: String,

    /// Subject area (e.g. "nonprofits", "climate tech")
    #[serde(default)]
    pub domain: String,

    /// Field definitions for listings
    pub schema: SchemaModel,

    /// Owner who created the directory
    pub created_by: String,

    /// Creation timestamp
    pub created: DateTime<Utc>,
}

impl Record for Directory {
    const PREFIX: &'static str = "DIR";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

/// Request to create a directory
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDirectory {
    pub name: String,
    pub description: String,
    pub domain: String,
    pub schema: SchemaModel,
    pub created_by: String,
}
