//! CLI command implementations

pub mod completions;
pub mod dir;
pub mod import;
pub mod init;
pub mod listing;
pub mod schema;
