//! Database access layer.
//!
//! This module provides access to the target PostgreSQL database:
//! - Single-use connections
//! - Schema extraction
//! - SQL execution
//! - Value mappings

pub mod connection;
pub mod runner;
pub mod schema;
pub mod types;

pub use runner::SqlRunner;
pub use schema::{SchemaExtractor, format_schema};
