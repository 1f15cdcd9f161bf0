//! SQL execution.
//!
//! Runs a statement verbatim on a fresh connection and returns every row as
//! an ordered tuple. No transaction, no timeout, no statement filtering: the
//! caller decides what to send.

use crate::db::connection;
use crate::db::types::RowToValues;
use crate::error::AssistantResult;
use crate::models::{ConnectionParams, QueryResult};
use sqlx::PgConnection;
use sqlx::postgres::PgRow;
use std::time::Instant;
use tracing::debug;

/// Executes SQL against the target database.
pub struct SqlRunner;

impl SqlRunner {
    /// Open a connection, execute `sql`, fetch all rows, close the connection.
    ///
    /// The connection is closed on every exit path, including execution errors.
    pub async fn run(params: &ConnectionParams, sql: &str) -> AssistantResult<QueryResult> {
        let start = Instant::now();
        debug!(sql = %sql, target_db = %params.display_target(), "Executing SQL");

        let mut conn = connection::open(params).await?;
        let result = fetch_rows(&mut conn, sql).await;
        connection::close(conn).await;

        let rows = result?;
        Ok(process_rows(rows, start))
    }
}

async fn fetch_rows(conn: &mut PgConnection, sql: &str) -> AssistantResult<Vec<PgRow>> {
    // Raw SQL without arguments goes through the simple query protocol
    use sqlx::Executor;
    Ok((&mut *conn).fetch_all(sql).await?)
}

/// Turn rows into a QueryResult.
fn process_rows<R: RowToValues>(rows: Vec<R>, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        return QueryResult::empty(execution_time_ms);
    };

    QueryResult {
        columns: first.get_column_names(),
        rows: rows.iter().map(RowToValues::to_values).collect(),
        execution_time_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, json};

    struct FakeRow(Vec<(&'static str, JsonValue)>);

    impl RowToValues for FakeRow {
        fn to_values(&self) -> Vec<JsonValue> {
            self.0.iter().map(|(_, v)| v.clone()).collect()
        }

        fn get_column_names(&self) -> Vec<String> {
            self.0.iter().map(|(n, _)| n.to_string()).collect()
        }
    }

    #[test]
    fn test_process_rows_empty() {
        let result = process_rows(Vec::<FakeRow>::new(), Instant::now());
        assert!(result.is_empty());
        assert!(result.columns.is_empty());
    }

    #[test]
    fn test_process_rows_keeps_order() {
        let rows = vec![
            FakeRow(vec![("id", json!(1)), ("name", json!("Alice"))]),
            FakeRow(vec![("id", json!(2)), ("name", json!("Bob"))]),
        ];
        let result = process_rows(rows, Instant::now());
        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows[0], vec![json!(1), json!("Alice")]);
        assert_eq!(result.rows[1], vec![json!(2), json!("Bob")]);
    }
}
