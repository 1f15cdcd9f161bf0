//! Output formatting for query results and training data.

use crate::models::{QueryResult, TrainingEntry};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// How rows are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One parenthesised tuple per row (default)
    #[default]
    Tuples,
    /// ASCII table format (like the psql/MySQL CLI)
    Table,
    /// JSON document with columns and rows
    Json,
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// `(1, 'Alice', NULL)`: strings quoted, everything else bare.
pub fn format_row_tuple(row: &[JsonValue]) -> String {
    let fields = row
        .iter()
        .map(|value| match value {
            JsonValue::String(s) => format!("'{}'", s.replace('\'', "\\'")),
            other => format_value(other),
        })
        .collect::<Vec<_>>();
    if fields.len() == 1 {
        format!("({},)", fields[0])
    } else {
        format!("({})", fields.join(", "))
    }
}

pub fn format_as_table(columns: &[String], rows: &[Vec<JsonValue>], execution_time_ms: u64) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in rows {
        for (i, value) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(format_value(value).width());
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(name, w)| pad(name, *w, Align::Center))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in rows {
        let row_str: String = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let value = row.get(i).unwrap_or(&JsonValue::Null);
                let align = if matches!(value, JsonValue::Number(_)) {
                    Align::Right
                } else {
                    Align::Left
                };
                pad(&format_value(value), *w, align)
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_text = if rows.len() == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {} in set ({:.2} sec)\n",
        rows.len(),
        row_text,
        execution_time_ms as f64 / 1000.0
    ));

    output
}

enum Align {
    Left,
    Right,
    Center,
}

// std padding counts chars, not display columns
fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = width.saturating_sub(text.width());
    let (left, right) = match align {
        Align::Left => (0, fill),
        Align::Right => (fill, 0),
        Align::Center => (fill / 2, fill - fill / 2),
    };
    format!("| {}{}{} ", " ".repeat(left), text, " ".repeat(right))
}

/// Render a query result in the requested format.
pub fn format_result(result: &QueryResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Tuples => result
            .rows
            .iter()
            .map(|row| format_row_tuple(row))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Table => {
            format_as_table(&result.columns, &result.rows, result.execution_time_ms)
        }
        OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
    }
}

/// One block per entry: id and kind, then the question (if any) and content.
pub fn format_training_data(entries: &[TrainingEntry]) -> String {
    if entries.is_empty() {
        return "No training data".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            let mut block = format!("[{}] {}\n", entry.kind, entry.id);
            if let Some(question) = &entry.question {
                block.push_str(&format!("  question: {}\n", question));
            }
            for line in entry.content.lines() {
                block.push_str("  ");
                block.push_str(line);
                block.push('\n');
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}
