//! PostgreSQL value mapping.
//!
//! This module maps result rows onto ordered tuples of JSON values.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. The raw value is decoded from its PostgreSQL text representation and
//!    converted according to its category
//!
//! The SQL runner sends statements without bind parameters, which makes the
//! server answer in the text format. Decoding everything through the text form
//! gives the same rendering `psql` shows for dates, intervals, arrays and other
//! types that have no natural JSON counterpart.

use serde_json::Value as JsonValue;
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Json,
    Text,
}

/// Classify a PostgreSQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    // Array types ("INT4[]") are rendered as text
    if lower.ends_with("[]") {
        return TypeCategory::Text;
    }

    if matches!(
        lower.as_str(),
        "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "oid"
    ) || lower.contains("serial")
    {
        return TypeCategory::Integer;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if matches!(
        lower.as_str(),
        "float4" | "float8" | "real" | "double precision"
    ) {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    // Default to text for everything else (varchar, text, char, date, time, uuid, etc.)
    TypeCategory::Text
}

// =============================================================================
// Text Representation
// =============================================================================

/// Raw text form of any PostgreSQL value.
#[derive(Debug)]
pub struct PgText(pub String);

impl Type<Postgres> for PgText {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

impl<'r> Decode<'r, Postgres> for PgText {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<Postgres>>::decode(value)?;
        Ok(PgText(s.to_string()))
    }
}

/// Convert a text-form value into JSON according to its category.
pub fn text_to_json(text: &str, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::Integer => text
            .parse::<i64>()
            .map(|v| JsonValue::Number(v.into()))
            .unwrap_or_else(|_| JsonValue::String(text.to_string())),
        TypeCategory::Float => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(text.to_string())),
        TypeCategory::Boolean => match text {
            "t" | "true" => JsonValue::Bool(true),
            "f" | "false" => JsonValue::Bool(false),
            other => JsonValue::String(other.to_string()),
        },
        TypeCategory::Json => serde_json::from_str(text)
            .unwrap_or_else(|_| JsonValue::String(text.to_string())),
        // Preserve the exact numeric representation
        TypeCategory::Decimal | TypeCategory::Text => JsonValue::String(text.to_string()),
    }
}

// =============================================================================
// Row to Tuple Trait
// =============================================================================

/// Trait for converting database rows to ordered value tuples.
pub trait RowToValues {
    fn to_values(&self) -> Vec<JsonValue>;
    fn get_column_names(&self) -> Vec<String>;
}

impl RowToValues for PgRow {
    fn to_values(&self) -> Vec<JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                match self.try_get::<Option<PgText>, _>(idx) {
                    Ok(Some(PgText(text))) => text_to_json(&text, category),
                    Ok(None) => JsonValue::Null,
                    Err(e) => {
                        tracing::error!(column = col.name(), "Failed to decode value: {:?}", e);
                        JsonValue::Null
                    }
                }
            })
            .collect()
    }

    fn get_column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}
