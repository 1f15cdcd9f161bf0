//! SQL Assistant Library
//!
//! Natural-language-to-SQL over PostgreSQL: extract a database schema, train
//! a retrieval store on DDL, documentation and example queries, ask a language
//! model to write SQL for a question, and run that SQL.

pub mod assistant;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod format;
pub mod llm;
pub mod models;
pub mod store;
pub mod web;

pub use assistant::{AskOutcome, Assistant};
pub use config::{AssistantConfig, Config};
pub use error::{AssistantError, AssistantResult};
pub use store::TrainingStore;
