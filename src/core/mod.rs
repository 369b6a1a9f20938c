//! Core module - identity, persistence, collaborators and configuration

pub mod command;
pub mod config;
pub mod entity;
pub mod identity;
pub mod moderation;
pub mod project;
pub mod services;
pub mod store;

pub use command::{CommandClient, CommandError, StaticGenerator};
pub use config::Config;
pub use entity::{ListingStatus, Record};
pub use identity::{IdParseError, RecordId, RecordPrefix};
pub use moderation::{ModerationEngine, ModerationError};
pub use project::{Project, ProjectError};
pub use services::{
    AutofillRequest, AutofillResponse, Autofiller, DirectoryStore, ExternalCallError,
    GenerationRequest, GenerationResponse, InterviewAnswers, ListingStore, SchemaGenerator,
};
pub use store::{Store, StoreError};
