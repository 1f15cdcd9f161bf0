//! Query-related data models.
//!
//! This module defines the result of running SQL against the target database.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Rows returned by the SQL runner.
///
/// Each row is an ordered tuple whose field order matches `columns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create an empty result (statements that return no rows).
    pub fn empty(execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            execution_time_ms,
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
