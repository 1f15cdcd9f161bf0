//! Schema extraction.
//!
//! Reads the column catalog of the `public` schema and renders it as the
//! pseudo-DDL text the assistant trains on.

use crate::db::connection;
use crate::error::AssistantResult;
use crate::models::{ConnectionParams, SchemaColumn};
use sqlx::{PgConnection, Row};
use tracing::{debug, info};

mod queries {
    // information_schema columns are domain types; cast so they decode as TEXT
    pub const LIST_COLUMNS: &str = r#"
        SELECT
            table_name::text AS table_name,
            column_name::text AS column_name,
            data_type::text AS data_type
        FROM information_schema.columns
        WHERE table_schema = 'public'
        ORDER BY table_name, ordinal_position
        "#;
}

/// Schema extractor for the target database.
pub struct SchemaExtractor;

impl SchemaExtractor {
    /// Fetch `(table, column, type)` rows ordered by table then column position.
    ///
    /// The connection is closed whether or not the query succeeds.
    pub async fn fetch_columns(params: &ConnectionParams) -> AssistantResult<Vec<SchemaColumn>> {
        let mut conn = connection::open(params).await?;
        let result = list_columns(&mut conn).await;
        connection::close(conn).await;

        let columns = result?;
        info!(
            target_db = %params.display_target(),
            columns = columns.len(),
            "Extracted schema"
        );
        Ok(columns)
    }

    /// Fetch and format the schema in one step.
    pub async fn extract(params: &ConnectionParams) -> AssistantResult<String> {
        let columns = Self::fetch_columns(params).await?;
        Ok(format_schema(&columns))
    }
}

async fn list_columns(conn: &mut PgConnection) -> AssistantResult<Vec<SchemaColumn>> {
    debug!("Querying information_schema.columns");
    let rows = sqlx::query(queries::LIST_COLUMNS)
        .fetch_all(&mut *conn)
        .await?;

    rows.iter()
        .map(|row| -> AssistantResult<SchemaColumn> {
            Ok(SchemaColumn {
                table: row.try_get("table_name")?,
                column: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
            })
        })
        .collect()
}

/// Render rows as `"<table>: <column> (<type>)"` lines joined by newlines.
///
/// One line per row, in input order, without a trailing newline.
pub fn format_schema(columns: &[SchemaColumn]) -> String {
    columns
        .iter()
        .map(SchemaColumn::describe)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_schema_example() {
        let columns = vec![
            SchemaColumn::new("customers", "id", "integer"),
            SchemaColumn::new("customers", "name", "character varying"),
        ];
        assert_eq!(
            format_schema(&columns),
            "customers: id (integer)\ncustomers: name (character varying)"
        );
    }

    #[test]
    fn test_format_schema_one_line_per_row_in_order() {
        let columns: Vec<SchemaColumn> = vec![
            ("categories", "category_id", "integer").into(),
            ("categories", "name", "text").into(),
            ("products", "product_id", "integer").into(),
            ("products", "price", "numeric").into(),
            ("sales", "sale_date", "date").into(),
        ];
        let formatted = format_schema(&columns);
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines.len(), columns.len());
        for (line, col) in lines.iter().zip(&columns) {
            assert_eq!(
                *line,
                format!("{}: {} ({})", col.table, col.column, col.data_type)
            );
        }
    }

    #[test]
    fn test_format_schema_empty() {
        assert_eq!(format_schema(&[]), "");
    }

    #[test]
    fn test_query_filters_public_and_orders() {
        let sql = queries::LIST_COLUMNS;
        assert!(sql.contains("information_schema.columns"));
        assert!(sql.contains("table_schema = 'public'"));
        assert!(sql.contains("ORDER BY table_name, ordinal_position"));
    }
}
