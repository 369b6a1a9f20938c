//! Facet computation and filtering over a listing snapshot
//!
//! Facets are recomputed on every call; listings change between renders and
//! nothing here caches across calls.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::entities::Listing;
use crate::listing::normalize;
use crate::schema::SchemaModel;

/// Fields that identify a listing and never make useful facets
pub const IDENTITY_FIELDS: &[&str] = &["name", "title", "description", "summary"];

/// Facets scanned off listing data when the schema offers none
pub const LEGACY_FACET_FIELDS: &[&str] = &["location", "focusAreas", "engagementTypes"];

/// Active filters: field key to one selected token
///
/// An absent key means "no constraint". Setting a blank value clears the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    selected: BTreeMap<String, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a value for a key; a blank value removes the constraint
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.selected.remove(&key);
        } else {
            self.selected.insert(key, value);
        }
    }

    /// Builder form of [`FilterState::set`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn clear(&mut self, key: &str) {
        self.selected.remove(key);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.selected.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Constraints currently in force
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selected.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse `key=value` pairs (as given on a command line)
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filters = FilterState::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("Invalid filter '{}': expected key=value", pair))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("Invalid filter '{}': missing field key", pair));
            }
            filters.set(key, value.trim());
        }
        Ok(filters)
    }
}

/// One facet: a filterable field and the values observed for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Facet {
    pub key: String,
    pub title: String,
    pub values: Vec<String>,
}

/// Facet engine bound to one directory schema
pub struct FacetEngine<'a> {
    schema: &'a SchemaModel,
}

impl<'a> FacetEngine<'a> {
    pub fn new(schema: &'a SchemaModel) -> Self {
        Self { schema }
    }

    /// Distinct tokens for `field_key` across all listings, sorted
    /// lexicographically with case-sensitive dedupe
    pub fn values(&self, listings: &[Listing], field_key: &str) -> Vec<String> {
        let values: BTreeSet<String> = listings
            .iter()
            .flat_map(|l| normalize::to_tokens(l.data.get(field_key)))
            .collect();
        values.into_iter().collect()
    }

    /// Whether a listing satisfies every active filter
    pub fn matches(listing: &Listing, filters: &FilterState) -> bool {
        filters.active().all(|(key, needle)| match listing.data.get(key) {
            Some(value) => normalize::contains_token(Some(value), needle),
            None => false,
        })
    }

    /// Schema keys usable as facets, in schema order; falls back to the
    /// legacy facet names when the schema has none
    pub fn eligible_fields(&self) -> Vec<String> {
        let eligible: Vec<String> = self
            .schema
            .field_order()
            .into_iter()
            .filter(|key| !is_identity_field(key))
            .map(String::from)
            .collect();

        if eligible.is_empty() {
            LEGACY_FACET_FIELDS.iter().map(|k| k.to_string()).collect()
        } else {
            eligible
        }
    }

    /// The facet panel: every eligible field with at least one observed value
    pub fn facets(&self, listings: &[Listing]) -> Vec<Facet> {
        let facets: Vec<Facet> = self
            .eligible_fields()
            .into_iter()
            .filter_map(|key| {
                let values = self.values(listings, &key);
                if values.is_empty() {
                    return None;
                }
                Some(Facet {
                    title: self.schema.title_for(&key),
                    key,
                    values,
                })
            })
            .collect();

        tracing::debug!(
            listings = listings.len(),
            facets = facets.len(),
            "computed facet panel"
        );
        facets
    }

    /// Listings that satisfy the filters, in their original order
    pub fn filter<'l>(&self, listings: &'l [Listing], filters: &FilterState) -> Vec<&'l Listing> {
        listings
            .iter()
            .filter(|l| Self::matches(l, filters))
            .collect()
    }
}

fn is_identity_field(key: &str) -> bool {
    let lowered = key.to_lowercase();
    IDENTITY_FIELDS.contains(&lowered.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::ListingStatus;
    use crate::core::identity::{RecordId, RecordPrefix};
    use chrono::Utc;
    use serde_json::{json, Value};

    fn listing(data: Value) -> Listing {
        Listing {
            id: RecordId::new(RecordPrefix::Lst),
            directory_id: RecordId::new(RecordPrefix::Dir),
            data: data.as_object().cloned().unwrap_or_default(),
            status: ListingStatus::Approved,
            created: Utc::now(),
        }
    }

    fn org_schema() -> SchemaModel {
        SchemaModel::parse(&json!({
            "properties": {
                "name": {"type": "string", "title": "Name"},
                "focusAreas": {"type": "string", "title": "Focus Areas"}
            },
            "required": ["name"]
        }))
        .unwrap()
    }

    fn org_listings() -> Vec<Listing> {
        vec![
            listing(json!({"name": "Acme", "focusAreas": "Health, Education"})),
            listing(json!({"name": "Beta", "focusAreas": "Health"})),
        ]
    }

    #[test]
    fn test_facet_values_sorted_union() {
        let schema = org_schema();
        let engine = FacetEngine::new(&schema);
        assert_eq!(
            engine.values(&org_listings(), "focusAreas"),
            vec!["Education", "Health"]
        );
    }

    #[test]
    fn test_facet_values_mixed_representations() {
        let schema = org_schema();
        let engine = FacetEngine::new(&schema);
        let listings = vec![
            listing(json!({"focusAreas": ["Arts", "health"]})),
            listing(json!({"focusAreas": "Health, Arts"})),
            listing(json!({"other": "x"})),
        ];
        assert_eq!(
            engine.values(&listings, "focusAreas"),
            vec!["Arts", "Health", "health"]
        );
    }

    #[test]
    fn test_matches_case_insensitive_substring() {
        let listings = org_listings();
        let health = FilterState::new().with("focusAreas", "health");
        let education = FilterState::new().with("focusAreas", "education");
        assert!(FacetEngine::matches(&listings[0], &health));
        assert!(!FacetEngine::matches(&listings[1], &education));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filters = FilterState::new();
        for l in org_listings() {
            assert!(FacetEngine::matches(&l, &filters));
        }
        assert!(FacetEngine::matches(&listing(json!({})), &filters));
    }

    #[test]
    fn test_absent_key_never_matches() {
        let filters = FilterState::new().with("location", "o");
        assert!(!FacetEngine::matches(&org_listings()[0], &filters));
    }

    #[test]
    fn test_all_filters_must_hold() {
        let l = listing(json!({"focusAreas": "Health", "location": "Oslo"}));
        let both = FilterState::new()
            .with("focusAreas", "heal")
            .with("location", "oslo");
        let one_wrong = FilterState::new()
            .with("focusAreas", "heal")
            .with("location", "bergen");
        assert!(FacetEngine::matches(&l, &both));
        assert!(!FacetEngine::matches(&l, &one_wrong));
    }

    #[test]
    fn test_blank_filter_value_is_no_constraint() {
        let mut filters = FilterState::new().with("focusAreas", "Arts");
        filters.set("focusAreas", "  ");
        assert!(filters.is_empty());
        assert!(FacetEngine::matches(&org_listings()[0], &filters));
    }

    #[test]
    fn test_eligible_fields_skip_identity() {
        let schema = SchemaModel::parse(&json!({
            "properties": {
                "Name": {}, "location": {}, "description": {}, "sector": {}, "summary": {}
            }
        }))
        .unwrap();
        let engine = FacetEngine::new(&schema);
        assert_eq!(engine.eligible_fields(), vec!["location", "sector"]);
    }

    #[test]
    fn test_eligible_fields_legacy_fallback() {
        let schema = SchemaModel::parse(&json!({"properties": {"name": {}, "title": {}}})).unwrap();
        let engine = FacetEngine::new(&schema);
        assert_eq!(
            engine.eligible_fields(),
            vec!["location", "focusAreas", "engagementTypes"]
        );

        let empty = SchemaModel::empty();
        assert_eq!(FacetEngine::new(&empty).eligible_fields().len(), 3);
    }

    #[test]
    fn test_facet_panel_omits_empty_facets() {
        let empty = SchemaModel::empty();
        let engine = FacetEngine::new(&empty);
        let listings = vec![listing(json!({"location": "Oslo", "focusAreas": ["Arts"]}))];
        let facets = engine.facets(&listings);
        let keys: Vec<&str> = facets.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["location", "focusAreas"]);
        assert_eq!(facets[1].title, "Focus Areas");
    }

    #[test]
    fn test_filter_keeps_order() {
        let schema = org_schema();
        let engine = FacetEngine::new(&schema);
        let listings = org_listings();
        let hits = engine.filter(&listings, &FilterState::new().with("focusAreas", "health"));
        let names: Vec<String> = hits.iter().map(|l| l.display("name")).collect();
        assert_eq!(names, vec!["Acme", "Beta"]);
    }

    #[test]
    fn test_filter_from_pairs() {
        let filters = FilterState::from_pairs(["location=Oslo", "sector = Health "]).unwrap();
        assert_eq!(filters.get("location"), Some("Oslo"));
        assert_eq!(filters.get("sector"), Some("Health"));
        assert!(FilterState::from_pairs(["nonsense"]).is_err());
        assert!(FilterState::from_pairs(["=x"]).is_err());
    }
}
