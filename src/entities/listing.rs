//! Listing record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::entity::{ListingStatus, Record};
use crate::core::identity::RecordId;
use crate::listing::normalize;

/// Raw listing data: field key to stored value, in insertion order
pub type ListingData = Map<String, Value>;

/// Keys tried, in order, when a listing needs a display label
const LABEL_KEYS: &[&str] = &["name", "title", "organization", "organizationName"];

/// One record submitted into a directory
///
/// `data` may lack schema keys and may carry keys the schema no longer
/// declares; readers ignore what they do not know.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Unique identifier
    pub id: RecordId,

    /// Owning directory
    pub directory_id: RecordId,

    /// Field values
    #[serde(default)]
    pub data: ListingData,

    /// Moderation status
    #[serde(default)]
    pub status: ListingStatus,

    /// Creation timestamp
    pub created: DateTime<Utc>,
}

impl Listing {
    /// Raw stored value for a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Normalized tokens for a key
    pub fn tokens(&self, key: &str) -> Vec<String> {
        normalize::to_tokens(self.data.get(key))
    }

    /// Display text for a key
    pub fn display(&self, key: &str) -> String {
        normalize::display_value(self.data.get(key))
    }
}

impl Record for Listing {
    const PREFIX: &'static str = "LST";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn label(&self) -> String {
        LABEL_KEYS
            .iter()
            .map(|k| self.display(k))
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| self.id.to_string())
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

/// Request to create a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    pub directory_id: RecordId,
    pub data: ListingData,
    pub status: ListingStatus,
}
