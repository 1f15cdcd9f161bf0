//! Training data models.
//!
//! A training record is one artifact the assistant learns from: table
//! structure (DDL), an example question with its SQL, free-text
//! documentation, or SQL on its own (the question is inferred later).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of stored training entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingKind {
    Ddl,
    Sql,
    Documentation,
}

impl TrainingKind {
    pub const ALL: [TrainingKind; 3] = [Self::Ddl, Self::Sql, Self::Documentation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ddl => "ddl",
            Self::Sql => "sql",
            Self::Documentation => "documentation",
        }
    }

    /// Suffix appended to entry ids so the kind is visible from the id alone.
    pub fn id_suffix(&self) -> &'static str {
        match self {
            Self::Ddl => "-ddl",
            Self::Sql => "-sql",
            Self::Documentation => "-doc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ddl" => Some(Self::Ddl),
            "sql" => Some(Self::Sql),
            "documentation" => Some(Self::Documentation),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrainingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single artifact submitted for training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainingRecord {
    Ddl { ddl: String },
    QuestionSql { question: String, sql: String },
    Documentation { documentation: String },
    /// SQL without a question; the assistant infers the question before storing.
    Sql { sql: String },
}

impl TrainingRecord {
    pub fn ddl(ddl: impl Into<String>) -> Self {
        Self::Ddl { ddl: ddl.into() }
    }

    pub fn question_sql(question: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::QuestionSql {
            question: question.into(),
            sql: sql.into(),
        }
    }

    pub fn documentation(documentation: impl Into<String>) -> Self {
        Self::Documentation {
            documentation: documentation.into(),
        }
    }

    pub fn sql(sql: impl Into<String>) -> Self {
        Self::Sql { sql: sql.into() }
    }

    /// Kind under which the record is stored.
    pub fn kind(&self) -> TrainingKind {
        match self {
            Self::Ddl { .. } => TrainingKind::Ddl,
            Self::QuestionSql { .. } | Self::Sql { .. } => TrainingKind::Sql,
            Self::Documentation { .. } => TrainingKind::Documentation,
        }
    }

    /// Text that gets embedded for similarity search.
    pub fn embedding_text(&self) -> String {
        match self {
            Self::Ddl { ddl } => ddl.clone(),
            Self::QuestionSql { question, sql } => format!("{}\n{}", question, sql),
            Self::Documentation { documentation } => documentation.clone(),
            Self::Sql { sql } => sql.clone(),
        }
    }

    /// Deterministic id: identical content always maps to the same entry.
    pub fn id(&self) -> String {
        let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, self.embedding_text().as_bytes());
        format!("{}{}", uuid, self.kind().id_suffix())
    }
}

/// Loosely-typed training request as accepted by the CLI, training files and
/// the web API. Each non-blank field yields one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl TrainRequest {
    /// Resolve the request into records, one per supplied field.
    ///
    /// Order: DDL, then SQL (paired with the question when given), then
    /// documentation. A question without SQL, or a request with nothing to
    /// train on, is rejected.
    pub fn into_records(self) -> Result<Vec<TrainingRecord>, String> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let question = non_blank(self.question);
        let sql = non_blank(self.sql);
        let ddl = non_blank(self.ddl);
        let documentation = non_blank(self.documentation);

        if question.is_some() && sql.is_none() {
            return Err("A question must be accompanied by its SQL".to_string());
        }

        let mut records = Vec::new();
        if let Some(ddl) = ddl {
            records.push(TrainingRecord::Ddl { ddl });
        }
        if let Some(sql) = sql {
            records.push(match question {
                Some(question) => TrainingRecord::QuestionSql { question, sql },
                None => TrainingRecord::Sql { sql },
            });
        }
        if let Some(documentation) = documentation {
            records.push(TrainingRecord::Documentation { documentation });
        }

        if records.is_empty() {
            return Err(
                "Nothing to train on: provide ddl, sql (optionally with a question) or documentation"
                    .to_string(),
            );
        }
        Ok(records)
    }
}

/// A stored training entry as listed by the training store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingEntry {
    pub id: String,
    pub kind: TrainingKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    pub content: String,
    pub created_at: String,
}
