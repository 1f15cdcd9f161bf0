//! Data models for the SQL assistant.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;
pub mod training;

// Re-export commonly used types
pub use connection::{ConnectionParams, ConnectionParamsError};
pub use query::QueryResult;
pub use schema::SchemaColumn;
pub use training::{TrainRequest, TrainingEntry, TrainingKind, TrainingRecord};
