//! Record trait and listing status

use chrono::{DateTime, Utc};

use crate::core::identity::RecordId;

/// Common trait for stored records (directories and listings)
pub trait Record {
    /// The record type prefix (e.g., "DIR", "LST")
    const PREFIX: &'static str;

    /// Get the record's unique ID
    fn id(&self) -> &RecordId;

    /// Human-readable label for tables and prompts
    fn label(&self) -> String;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;
}

/// Moderation status of a listing
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ListingStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ListingStatus::Pending),
            "approved" => Ok(ListingStatus::Approved),
            "rejected" => Ok(ListingStatus::Rejected),
            _ => Err(format!("Unknown listing status: {}", s)),
        }
    }
}
