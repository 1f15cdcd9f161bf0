//! Integration tests for the assistant pipeline with a scripted model.

use async_trait::async_trait;
use sql_assistant::config::AssistantConfig;
use sql_assistant::embedding::HashingEmbedder;
use sql_assistant::error::{AssistantError, AssistantResult};
use sql_assistant::llm::{ChatMessage, ChatModel, Role};
use sql_assistant::models::{ConnectionParams, TrainRequest, TrainingKind, TrainingRecord};
use sql_assistant::{Assistant, TrainingStore};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replies in order and records every conversation it receives.
#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    conversations: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    fn with_replies(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            conversations: Mutex::new(Vec::new()),
        })
    }

    fn last_conversation(&self) -> Vec<ChatMessage> {
        self.conversations.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn submit(&self, messages: &[ChatMessage]) -> AssistantResult<String> {
        self.conversations.lock().unwrap().push(messages.to_vec());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AssistantError::llm("script exhausted", "add more replies"))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

async fn assistant(model: Arc<ScriptedModel>) -> Assistant {
    let store = TrainingStore::in_memory(Arc::new(HashingEmbedder::new()))
        .await
        .unwrap();
    Assistant::new(AssistantConfig::default(), store, model)
}

#[tokio::test]
async fn test_generate_sql_uses_training_context() {
    let model = ScriptedModel::with_replies(&[
        "Sure! Here you go:\n```sql\nSELECT * FROM customers WHERE city = 'New York';\n```",
    ]);
    let assistant = assistant(model.clone()).await;

    assistant
        .train(TrainingRecord::ddl(
            "customers: id (integer)\ncustomers: name (character varying)\ncustomers: city (character varying)",
        ))
        .await
        .unwrap();
    assistant
        .train(TrainingRecord::question_sql(
            "Show me details of Alice",
            "select * from customers where name='Alice'",
        ))
        .await
        .unwrap();
    assistant
        .train(TrainingRecord::documentation(
            "Cities are stored with their full English names",
        ))
        .await
        .unwrap();

    let sql = assistant
        .generate_sql("List all customers in New York")
        .await
        .unwrap();
    assert_eq!(sql, "SELECT * FROM customers WHERE city = 'New York';");

    let conversation = model.last_conversation();
    assert_eq!(conversation[0].role, Role::System);
    assert!(conversation[0].content.contains("customers: city (character varying)"));
    assert!(conversation[0].content.contains("full English names"));
    assert_eq!(
        conversation[1],
        ChatMessage::user("Show me details of Alice")
    );
    assert_eq!(
        conversation.last().unwrap(),
        &ChatMessage::user("List all customers in New York")
    );
}

#[tokio::test]
async fn test_sql_only_training_generates_question() {
    let model = ScriptedModel::with_replies(&["  What is the total revenue per category?\n"]);
    let assistant = assistant(model.clone()).await;

    let request = TrainRequest {
        sql: Some(
            "SELECT category, SUM(price * quantity) FROM sales GROUP BY category".to_string(),
        ),
        ..Default::default()
    };
    let mut records = request.into_records().unwrap();
    assert_eq!(records.len(), 1);
    let id = assistant.train(records.remove(0)).await.unwrap();
    assert!(id.ends_with("-sql"));

    let entries = assistant.training_data().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, TrainingKind::Sql);
    assert_eq!(
        entries[0].question.as_deref(),
        Some("What is the total revenue per category?")
    );

    let prompt = model.last_conversation();
    assert_eq!(
        prompt[1].content,
        "SELECT category, SUM(price * quantity) FROM sales GROUP BY category"
    );
}

#[tokio::test]
async fn test_ask_reports_validity_without_connection() {
    let model = ScriptedModel::with_replies(&["I cannot answer that from the given context."]);
    let assistant = assistant(model).await;

    let outcome = assistant.ask("Who won the match?", true).await.unwrap();
    assert_eq!(outcome.sql, "I cannot answer that from the given context.");
    assert!(!outcome.is_valid);
    assert!(outcome.result.is_none());
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_schema_and_run_sql_require_connection() {
    let assistant = assistant(ScriptedModel::with_replies(&[])).await;

    assert!(matches!(
        assistant.schema().await,
        Err(AssistantError::NotConnected { .. })
    ));
    assert!(matches!(
        assistant.train_schema().await,
        Err(AssistantError::NotConnected { .. })
    ));
    assert!(matches!(
        assistant.run_sql("SELECT 1").await,
        Err(AssistantError::NotConnected { .. })
    ));
}

#[tokio::test]
async fn test_llm_failure_propagates() {
    let assistant = assistant(ScriptedModel::with_replies(&[])).await;
    let err = assistant.generate_sql("How many customers?").await.unwrap_err();
    assert!(matches!(err, AssistantError::Llm { .. }));
}

#[tokio::test]
async fn test_remove_training_data() {
    let assistant = assistant(ScriptedModel::with_replies(&[])).await;
    let id = assistant
        .train(TrainingRecord::documentation("revenue = price * quantity"))
        .await
        .unwrap();

    assert!(assistant.remove_training_data(&id).await.unwrap());
    assert!(!assistant.remove_training_data(&id).await.unwrap());
    assert!(assistant.training_data().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ask_captures_execution_failure() {
    let model = ScriptedModel::with_replies(&["```sql\nSELECT count(*) FROM customers\n```"]);
    // Nothing listens on port 1
    let assistant = assistant(model).await.with_connection(ConnectionParams::new(
        "127.0.0.1",
        "postgres",
        "postgres",
        "",
        1,
    ));

    let outcome = assistant.ask("How many customers?", true).await.unwrap();
    assert_eq!(outcome.sql, "SELECT count(*) FROM customers");
    assert!(outcome.is_valid);
    assert!(outcome.result.is_none());
    let error = outcome.error.unwrap();
    assert!(error.contains("Connection failed"), "unexpected error: {}", error);
}
