//! Schema-related data models.

use serde::{Deserialize, Serialize};

/// One row of `information_schema.columns`: which table, which column, what type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub table: String,
    pub column: String,
    pub data_type: String,
}

impl SchemaColumn {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            data_type: data_type.into(),
        }
    }

    /// Render as `"<table>: <column> (<type>)"`.
    pub fn describe(&self) -> String {
        format!("{}: {} ({})", self.table, self.column, self.data_type)
    }
}

impl From<(&str, &str, &str)> for SchemaColumn {
    fn from((table, column, data_type): (&str, &str, &str)) -> Self {
        Self::new(table, column, data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let col = SchemaColumn::new("customers", "id", "integer");
        assert_eq!(col.describe(), "customers: id (integer)");
    }

    #[test]
    fn test_from_tuple() {
        let col: SchemaColumn = ("sales", "sale_date", "date").into();
        assert_eq!(col.table, "sales");
        assert_eq!(col.data_type, "date");
    }
}
