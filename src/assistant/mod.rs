//! The assistant: retrieval-augmented SQL generation over the training store.
//!
//! An [`Assistant`] ties together:
//! - the [`TrainingStore`] holding DDL, documentation and question/SQL examples
//! - a [`ChatModel`] that turns a prompt into SQL
//! - optional [`ConnectionParams`] for schema extraction and execution

pub mod prompt;
pub mod sql;

pub use prompt::PromptBuilder;
pub use sql::{extract_sql, is_sql_valid};

use crate::config::{AssistantConfig, LlmBackend};
use crate::db::{SchemaExtractor, SqlRunner};
use crate::embedding::{Embedder, HashingEmbedder};
use crate::error::{AssistantError, AssistantResult};
use crate::llm::{ChatModel, OllamaChat, OpenAiChat, OpenAiClient, OpenAiEmbedder};
use crate::models::{ConnectionParams, QueryResult, TrainingEntry, TrainingKind, TrainingRecord};
use crate::store::TrainingStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of [`Assistant::ask`].
#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub question: String,
    pub sql: String,
    pub is_valid: bool,
    /// Rows, when the SQL was executed successfully.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    /// Execution failure, reported as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Assistant {
    config: AssistantConfig,
    store: TrainingStore,
    chat: Arc<dyn ChatModel>,
    prompts: PromptBuilder,
    connection: Option<ConnectionParams>,
}

impl Assistant {
    pub fn new(config: AssistantConfig, store: TrainingStore, chat: Arc<dyn ChatModel>) -> Self {
        let prompts = PromptBuilder::new(config.dialect.clone(), config.max_prompt_tokens);
        Self {
            config,
            store,
            chat,
            prompts,
            connection: None,
        }
    }

    /// Build the store, embedder and chat backend described by `config`.
    pub async fn from_config(config: AssistantConfig) -> AssistantResult<Self> {
        config.validate()?;

        let client = OpenAiClient::new(config.base_url.clone(), config.api_key.clone())?;
        let embedder: Arc<dyn Embedder> = match &config.embedding_model {
            Some(model) => Arc::new(OpenAiEmbedder::new(client.clone(), model.clone())),
            None => Arc::new(HashingEmbedder::new()),
        };
        let chat: Arc<dyn ChatModel> = match config.backend {
            LlmBackend::Openai => Arc::new(OpenAiChat::new(
                client,
                config.model.clone(),
                config.temperature,
            )),
            LlmBackend::Ollama => Arc::new(OllamaChat::new(
                &config.ollama_host,
                config.model.clone(),
                config.temperature,
            )?),
        };

        let store = TrainingStore::open(&config.store_path, embedder).await?;
        info!(
            backend = %config.backend,
            model = %config.model,
            store = %config.store_path,
            "Assistant initialized"
        );
        Ok(Self::new(config, store, chat))
    }

    /// Use `params` for schema extraction and SQL execution.
    pub fn connect(&mut self, params: ConnectionParams) {
        info!(target_db = %params.display_target(), "Connection parameters set");
        self.connection = Some(params);
    }

    pub fn with_connection(mut self, params: ConnectionParams) -> Self {
        self.connect(params);
        self
    }

    pub fn connection(&self) -> Option<&ConnectionParams> {
        self.connection.as_ref()
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn store(&self) -> &TrainingStore {
        &self.store
    }

    fn require_connection(&self, operation: &str) -> AssistantResult<&ConnectionParams> {
        self.connection
            .as_ref()
            .ok_or_else(|| AssistantError::not_connected(operation))
    }

    /// Store one training record and return its id.
    ///
    /// SQL without a question gets its question generated first.
    #[instrument(skip(self, record), fields(kind = %record.kind()))]
    pub async fn train(&self, record: TrainingRecord) -> AssistantResult<String> {
        if record.embedding_text().trim().is_empty() {
            return Err(AssistantError::invalid_input("Training content is empty"));
        }

        let record = match record {
            TrainingRecord::Sql { sql } => {
                let question = self.generate_question(&sql).await?;
                info!(question = %question, "Generated question for SQL");
                TrainingRecord::QuestionSql { question, sql }
            }
            other => other,
        };

        let id = self.store.add(&record).await?;
        info!(id = %id, "Trained");
        Ok(id)
    }

    /// The public schema of the connected database, one column per line.
    pub async fn schema(&self) -> AssistantResult<String> {
        let params = self.require_connection("schema")?;
        SchemaExtractor::extract(params).await
    }

    /// Extract the public schema from the connected database and store it as DDL.
    pub async fn train_schema(&self) -> AssistantResult<String> {
        let schema = self.schema().await?;
        if schema.is_empty() {
            return Err(AssistantError::invalid_input(
                "The public schema has no columns to train on",
            ));
        }
        self.train(TrainingRecord::ddl(schema)).await
    }

    pub async fn training_data(&self) -> AssistantResult<Vec<TrainingEntry>> {
        self.store.list().await
    }

    pub async fn remove_training_data(&self, id: &str) -> AssistantResult<bool> {
        let removed = self.store.remove(id).await?;
        if !removed {
            warn!(id, "No training entry with this id");
        }
        Ok(removed)
    }

    /// Ask the model which question `sql` answers.
    pub async fn generate_question(&self, sql: &str) -> AssistantResult<String> {
        let response = self.chat.submit(&self.prompts.question_prompt(sql)).await?;
        Ok(response.trim().to_string())
    }

    /// Retrieve context for `question`, prompt the model and extract its SQL.
    #[instrument(skip(self), fields(model = %self.chat.model()))]
    pub async fn generate_sql(&self, question: &str) -> AssistantResult<String> {
        if question.trim().is_empty() {
            return Err(AssistantError::invalid_input("The question is empty"));
        }

        let n = self.config.n_results;
        let examples = self.store.similar(TrainingKind::Sql, question, n).await?;
        let ddl = self.store.similar(TrainingKind::Ddl, question, n).await?;
        let documentation = self
            .store
            .similar(TrainingKind::Documentation, question, n)
            .await?;

        let messages = self
            .prompts
            .sql_prompt(question, &examples, &ddl, &documentation);
        let response = self.chat.submit(&messages).await?;
        let sql = extract_sql(&response);

        info!(
            examples = examples.len(),
            ddl = ddl.len(),
            documentation = documentation.len(),
            "Generated SQL"
        );
        Ok(sql)
    }

    /// Up to `n` questions a user might ask next.
    ///
    /// Stored example questions come first; the model fills the remainder.
    pub async fn suggested_questions(&self, n: usize) -> AssistantResult<Vec<String>> {
        let mut questions = self.store.questions(n).await?;
        if questions.len() >= n {
            return Ok(questions);
        }

        let missing = n - questions.len();
        let response = self
            .chat
            .submit(&self.prompts.suggestion_prompt(&questions, missing))
            .await?;
        let generated = response
            .lines()
            .map(strip_list_marker)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .filter(|q| !questions.contains(q))
            .take(missing)
            .collect::<Vec<_>>();
        questions.extend(generated);
        Ok(questions)
    }

    /// Execute `sql` verbatim against the connected database.
    pub async fn run_sql(&self, sql: &str) -> AssistantResult<QueryResult> {
        let params = self.require_connection("run_sql")?;
        SqlRunner::run(params, sql).await
    }

    /// Generate SQL for `question` and, when `run` is set and a connection
    /// exists, execute it. Execution failures are captured in the outcome.
    pub async fn ask(&self, question: &str, run: bool) -> AssistantResult<AskOutcome> {
        let sql = self.generate_sql(question).await?;
        let is_valid = is_sql_valid(&sql);

        let mut outcome = AskOutcome {
            question: question.to_string(),
            sql,
            is_valid,
            result: None,
            error: None,
        };

        if run && self.connection.is_some() {
            match self.run_sql(&outcome.sql).await {
                Ok(result) => outcome.result = Some(result),
                Err(e) => {
                    warn!(error = %e, "Generated SQL failed");
                    outcome.error = Some(e.to_string());
                }
            }
        }
        Ok(outcome)
    }
}

/// Drop a leading `1.`, `2)`, `-` or `*` list marker.
///
/// Digits only count as a marker when followed by `.` or `)` and whitespace,
/// so questions that start with a number are kept whole.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let digits = line.len() - line.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &line[digits..];

    let marker = if digits > 0 {
        rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))
    } else {
        rest.strip_prefix('-').or_else(|| rest.strip_prefix('*'))
    };

    match marker {
        Some(after) if after.is_empty() || after.starts_with(char::is_whitespace) => after.trim(),
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedChat {
        reply: String,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn submit(&self, messages: &[ChatMessage]) -> AssistantResult<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    async fn assistant(reply: &str) -> (Assistant, Arc<ScriptedChat>) {
        let chat = Arc::new(ScriptedChat {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let store = TrainingStore::in_memory(Arc::new(HashingEmbedder::new()))
            .await
            .unwrap();
        let assistant = Assistant::new(AssistantConfig::default(), store, chat.clone());
        (assistant, chat)
    }

    #[tokio::test]
    async fn test_run_sql_requires_connection() {
        let (assistant, _) = assistant("SELECT 1").await;
        let err = assistant.run_sql("SELECT 1").await.unwrap_err();
        assert!(matches!(err, AssistantError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn test_ask_without_connection_does_not_run() {
        let (assistant, _) = assistant("```sql\nSELECT 1\n```").await;
        let outcome = assistant.ask("one?", true).await.unwrap();
        assert_eq!(outcome.sql, "SELECT 1");
        assert!(outcome.is_valid);
        assert!(outcome.result.is_none());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_empty_training_rejected() {
        let (assistant, _) = assistant("").await;
        let err = assistant.train(TrainingRecord::ddl("  ")).await.unwrap_err();
        assert!(matches!(err, AssistantError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let (assistant, chat) = assistant("SELECT 1").await;
        assert!(assistant.generate_sql(" ").await.is_err());
        assert!(chat.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_suggested_questions_prefers_stored() {
        let (assistant, chat) = assistant("1. How many orders?\n2. Top customers").await;
        assistant
            .train(TrainingRecord::question_sql(
                "Show me details of Alice",
                "select * from customers where name='Alice'",
            ))
            .await
            .unwrap();

        let questions = assistant.suggested_questions(3).await.unwrap();
        assert_eq!(
            questions,
            vec![
                "Show me details of Alice".to_string(),
                "How many orders?".to_string(),
                "Top customers".to_string(),
            ]
        );
        assert_eq!(chat.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_strip_list_marker() {
        assert_eq!(strip_list_marker("1. How many orders?"), "How many orders?");
        assert_eq!(strip_list_marker("  12) Top customers"), "Top customers");
        assert_eq!(strip_list_marker("- Revenue by city"), "Revenue by city");
        assert_eq!(strip_list_marker("* Revenue by city"), "Revenue by city");
        assert_eq!(
            strip_list_marker("10 most expensive products?"),
            "10 most expensive products?"
        );
        assert_eq!(strip_list_marker("2024 revenue by month?"), "2024 revenue by month?");
        assert_eq!(strip_list_marker("3.5% discount orders?"), "3.5% discount orders?");
        assert_eq!(strip_list_marker("-1 balances?"), "-1 balances?");
    }

    #[tokio::test]
    async fn test_suggested_questions_keep_leading_numbers() {
        let (assistant, _) =
            assistant("10 most expensive products?\n2024 revenue by month?").await;
        let questions = assistant.suggested_questions(2).await.unwrap();
        assert_eq!(
            questions,
            vec![
                "10 most expensive products?".to_string(),
                "2024 revenue by month?".to_string(),
            ]
        );
    }
}
