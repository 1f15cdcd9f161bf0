//! Pulling SQL out of model responses and checking it.
//!
//! Models wrap their answers in prose and markdown fences. [`extract_sql`]
//! recovers the statement; [`is_sql_valid`] decides whether it is a read-only
//! query by parsing it with [sqlparser](https://docs.rs/sqlparser/).

use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

const FENCE: &str = "```";

/// Extract the SQL statement from a model response.
///
/// In order of preference:
/// 1. the body of the first ```` ```sql ```` fenced block
/// 2. the first line starting with `WITH` or `SELECT`, through the next `;`
/// 3. the body of the first fenced block of any language
/// 4. the whole response, trimmed
pub fn extract_sql(response: &str) -> String {
    if let Some(body) = fenced_block(response, Some("sql")) {
        return body;
    }
    if let Some(statement) = leading_statement(response) {
        return statement;
    }
    if let Some(body) = fenced_block(response, None) {
        return body;
    }
    response.trim().to_string()
}

/// Whether `sql` parses as one or more read-only queries.
pub fn is_sql_valid(sql: &str) -> bool {
    match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(statements) => {
            !statements.is_empty()
                && statements
                    .iter()
                    .all(|s| matches!(s, Statement::Query(_)))
        }
        Err(_) => false,
    }
}

/// Body of the first fenced block, optionally restricted to a language tag.
fn fenced_block(text: &str, language: Option<&str>) -> Option<String> {
    let mut rest = text;
    while let Some(open) = rest.find(FENCE) {
        let after = &rest[open + FENCE.len()..];
        let (tag, body) = match after.find('\n') {
            Some(nl) => (after[..nl].trim(), &after[nl + 1..]),
            None => (after.trim(), ""),
        };

        let end = body.find(FENCE).unwrap_or(body.len());
        let matches = match language {
            Some(lang) => tag.eq_ignore_ascii_case(lang),
            None => true,
        };
        if matches {
            let content = body[..end].trim();
            if !content.is_empty() {
                return Some(content.to_string());
            }
        }

        if end == body.len() {
            return None;
        }
        rest = &body[end + FENCE.len()..];
    }
    None
}

/// First statement beginning a line with WITH or SELECT, through its `;`.
fn leading_statement(text: &str) -> Option<String> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if starts_with_keyword(trimmed, "with") || starts_with_keyword(trimmed, "select") {
            let start = offset + (line.len() - trimmed.len());
            let tail = &text[start..];
            let end = match (tail.find(';'), tail.find(FENCE)) {
                (Some(semi), Some(fence)) if fence < semi => fence,
                (Some(semi), _) => semi + 1,
                (None, Some(fence)) => fence,
                (None, None) => tail.len(),
            };
            return Some(tail[..end].trim().to_string());
        }
        offset += line.len();
    }
    None
}

fn starts_with_keyword(text: &str, keyword: &str) -> bool {
    let Some(head) = text.get(..keyword.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(keyword) {
        return false;
    }
    match text[keyword.len()..].chars().next() {
        None => true,
        Some(c) => c.is_whitespace() || c == '(' || c == '*',
    }
}
