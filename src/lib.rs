//! TDK: Tessera Directory Kit
//!
//! A schema-driven directory engine: operators describe a directory, a
//! generator proposes the field schema, and listings are collected,
//! validated, moderated and browsed through facets derived from that schema.

pub mod cli;
pub mod core;
pub mod entities;
pub mod listing;
pub mod schema;
