//! Boundary with external collaborators
//!
//! Schema generation, autofill and persistence are owned elsewhere; the core
//! only sees these traits and the request/response shapes below. Calls are
//! synchronous: the single driving actor waits for each one to finish before
//! issuing the next input.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::entity::ListingStatus;
use crate::core::identity::RecordId;
use crate::entities::{Directory, Listing, NewDirectory, NewListing};

/// A collaborator call failed; the message is shown to the operator as-is
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(tdk::external::call_failed))]
pub struct ExternalCallError {
    message: String,
}

impl ExternalCallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Answers collected in the interview step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewAnswers {
    pub directory_type: String,
    #[serde(default)]
    pub example_organizations: String,
    #[serde(default)]
    pub required_fields: String,
    #[serde(default)]
    pub optional_fields: String,
}

/// Schema generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub name: String,
    pub description: String,
    pub domain: String,
    pub interview_answers: InterviewAnswers,
}

/// Schema generation response; `schema` is a raw, unvalidated document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationResponse {
    pub schema: Value,
}

/// Autofill request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofillRequest {
    pub directory_id: RecordId,
    pub entity_name: String,
}

/// Autofill response: best-effort field values
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AutofillResponse {
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Produces a raw schema document from an operator's description
pub trait SchemaGenerator {
    fn generate_schema(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, ExternalCallError>;
}

/// Pre-populates listing fields from an entity name
pub trait Autofiller {
    fn autofill(&self, request: &AutofillRequest) -> Result<AutofillResponse, ExternalCallError>;
}

/// Directory persistence
pub trait DirectoryStore {
    fn create_directory(&mut self, directory: &NewDirectory) -> Result<RecordId, ExternalCallError>;

    fn fetch_directory(&self, id: &RecordId) -> Result<Option<Directory>, ExternalCallError>;
}

/// Listing persistence
pub trait ListingStore {
    fn create_listing(&mut self, listing: &NewListing) -> Result<RecordId, ExternalCallError>;

    /// Listings of one directory, optionally restricted to one status
    fn list_listings(
        &self,
        directory_id: &RecordId,
        status: Option<ListingStatus>,
    ) -> Result<Vec<Listing>, ExternalCallError>;
}
