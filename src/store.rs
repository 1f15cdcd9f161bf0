//! Training store.
//!
//! A small embedded vector store: every training entry is kept in a SQLite
//! database together with its embedding, and retrieval ranks the entries of a
//! kind by cosine similarity to the embedded query text.
//!
//! # Layout
//!
//! One table, `training_data`, keyed by the deterministic entry id. Vectors
//! are stored as JSON arrays. Retrieval loads the vectors of one kind and
//! ranks them in memory, which is plenty for training sets of a few thousand
//! entries.

use crate::embedding::{Embedder, cosine_similarity};
use crate::error::{AssistantError, AssistantResult};
use crate::models::{TrainingEntry, TrainingKind, TrainingRecord};
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Location value that selects a throwaway in-memory store.
pub const IN_MEMORY: &str = ":memory:";

mod queries {
    pub const CREATE_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS training_data (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            question TEXT,
            content TEXT NOT NULL,
            embedding TEXT NOT NULL,
            embedder TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#;

    pub const CREATE_KIND_INDEX: &str =
        "CREATE INDEX IF NOT EXISTS idx_training_data_kind ON training_data (kind)";

    pub const INSERT: &str = r#"
        INSERT INTO training_data (id, kind, question, content, embedding, embedder, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO NOTHING
        "#;

    // created_at is fixed-width RFC 3339, so text order is time order
    pub const LIST: &str = r#"
        SELECT id, kind, question, content, created_at
        FROM training_data
        ORDER BY kind, created_at, id
        "#;

    // Vectors from another embedder live in a different space
    pub const LIST_KIND_WITH_EMBEDDINGS: &str = r#"
        SELECT id, kind, question, content, created_at, embedding
        FROM training_data
        WHERE kind = ? AND embedder = ?
        "#;

    pub const LIST_QUESTIONS: &str = r#"
        SELECT question
        FROM training_data
        WHERE kind = 'sql' AND question IS NOT NULL
        ORDER BY created_at DESC, id
        LIMIT ?
        "#;

    pub const DELETE: &str = "DELETE FROM training_data WHERE id = ?";
}

/// Embedded store of training entries.
#[derive(Clone)]
pub struct TrainingStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl TrainingStore {
    /// Open (creating if needed) a store at `location`.
    ///
    /// `location` is a file path, or [`IN_MEMORY`] for a store that lives as
    /// long as this handle.
    pub async fn open(location: &str, embedder: Arc<dyn Embedder>) -> AssistantResult<Self> {
        let pool = if location == IN_MEMORY {
            // Each in-memory connection is its own database: keep exactly one alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
                .await?
        } else {
            let options = SqliteConnectOptions::new()
                .filename(location)
                .create_if_missing(true);
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(options)
                .await
                .map_err(|e| {
                    AssistantError::store(format!("Cannot open store '{}': {}", location, e))
                })?
        };

        sqlx::query(queries::CREATE_TABLE).execute(&pool).await?;
        sqlx::query(queries::CREATE_KIND_INDEX).execute(&pool).await?;

        info!(location, embedder = embedder.name(), "Training store ready");
        Ok(Self { pool, embedder })
    }

    /// Convenience constructor for an in-memory store.
    pub async fn in_memory(embedder: Arc<dyn Embedder>) -> AssistantResult<Self> {
        Self::open(IN_MEMORY, embedder).await
    }

    /// Embed and store a record; returns its id.
    ///
    /// Storing identical content twice keeps the first entry.
    /// [`TrainingRecord::Sql`] must be resolved into a question/SQL pair first.
    pub async fn add(&self, record: &TrainingRecord) -> AssistantResult<String> {
        let (question, content) = match record {
            TrainingRecord::Ddl { ddl } => (None, ddl.as_str()),
            TrainingRecord::QuestionSql { question, sql } => {
                (Some(question.as_str()), sql.as_str())
            }
            TrainingRecord::Documentation { documentation } => (None, documentation.as_str()),
            TrainingRecord::Sql { .. } => {
                return Err(AssistantError::invalid_input(
                    "SQL without a question cannot be stored directly",
                ));
            }
        };

        let id = record.id();
        let embedding = self.embedder.embed(&record.embedding_text()).await?;
        let embedding_json = serde_json::to_string(&embedding)
            .map_err(|e| AssistantError::internal(format!("Cannot encode embedding: {}", e)))?;

        let result = sqlx::query(queries::INSERT)
            .bind(&id)
            .bind(record.kind().as_str())
            .bind(question)
            .bind(content)
            .bind(embedding_json)
            .bind(self.embedder.name())
            .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            .execute(&self.pool)
            .await?;

        debug!(
            id = %id,
            kind = %record.kind(),
            inserted = result.rows_affected() > 0,
            "Stored training entry"
        );
        Ok(id)
    }

    /// All entries, grouped by kind and ordered by creation time.
    pub async fn list(&self) -> AssistantResult<Vec<TrainingEntry>> {
        let rows = sqlx::query(queries::LIST).fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }

    /// Delete an entry; returns whether it existed.
    pub async fn remove(&self, id: &str) -> AssistantResult<bool> {
        let result = sqlx::query(queries::DELETE)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The `n` entries of `kind` most similar to `text`, best first.
    ///
    /// Only entries embedded by this store's embedder take part.
    pub async fn similar(
        &self,
        kind: TrainingKind,
        text: &str,
        n: usize,
    ) -> AssistantResult<Vec<TrainingEntry>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(text).await?;
        let rows = sqlx::query(queries::LIST_KIND_WITH_EMBEDDINGS)
            .bind(kind.as_str())
            .bind(self.embedder.name())
            .fetch_all(&self.pool)
            .await?;

        let mut scored = rows
            .iter()
            .map(|row| -> AssistantResult<(f32, TrainingEntry)> {
                let raw: String = row.try_get("embedding")?;
                let vector: Vec<f32> = serde_json::from_str(&raw).map_err(|e| {
                    AssistantError::store(format!("Corrupt embedding in store: {}", e))
                })?;
                Ok((cosine_similarity(&query_vector, &vector), entry_from_row(row)?))
            })
            .collect::<AssistantResult<Vec<_>>>()?;

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.created_at.cmp(&b.1.created_at))
        });
        scored.truncate(n);

        debug!(kind = %kind, hits = scored.len(), "Retrieved similar entries");
        Ok(scored.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Up to `n` stored example questions, newest first.
    pub async fn questions(&self, n: usize) -> AssistantResult<Vec<String>> {
        let rows = sqlx::query(queries::LIST_QUESTIONS)
            .bind(n as i64)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("question").map_err(Into::into))
            .collect()
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn entry_from_row(row: &SqliteRow) -> AssistantResult<TrainingEntry> {
    let kind: String = row.try_get("kind")?;
    let kind = TrainingKind::parse(&kind)
        .ok_or_else(|| AssistantError::store(format!("Unknown training kind '{}'", kind)))?;

    Ok(TrainingEntry {
        id: row.try_get("id")?,
        kind,
        question: row.try_get("question")?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;

    async fn store() -> TrainingStore {
        TrainingStore::in_memory(Arc::new(HashingEmbedder::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let store = store().await;
        let id = store
            .add(&TrainingRecord::ddl("CREATE TABLE customers (id INT)"))
            .await
            .unwrap();
        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].kind, TrainingKind::Ddl);
        assert!(entries[0].question.is_none());
    }

    #[tokio::test]
    async fn test_sql_without_question_rejected() {
        let store = store().await;
        let err = store.add(&TrainingRecord::sql("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, AssistantError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_similar_zero_results() {
        let store = store().await;
        store
            .add(&TrainingRecord::documentation("revenue = price * quantity"))
            .await
            .unwrap();
        let hits = store
            .similar(TrainingKind::Documentation, "revenue", 0)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
