//! Integration tests for the SQLite-backed training store.

use async_trait::async_trait;
use sql_assistant::embedding::{Embedder, HashingEmbedder};
use sql_assistant::error::AssistantResult;
use sql_assistant::models::{TrainingKind, TrainingRecord};
use sql_assistant::store::TrainingStore;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::assert_ok;

/// Same vector space as the hashing embedder, recorded under another name.
struct RenamedEmbedder(HashingEmbedder);

#[async_trait]
impl Embedder for RenamedEmbedder {
    async fn embed(&self, text: &str) -> AssistantResult<Vec<f32>> {
        Ok(self.0.embed_sync(text))
    }

    fn name(&self) -> &str {
        "other-model"
    }
}

async fn open(path: &str) -> TrainingStore {
    TrainingStore::open(path, Arc::new(HashingEmbedder::new()))
        .await
        .expect("Failed to open store")
}

#[tokio::test]
async fn test_adding_same_content_twice_keeps_one_entry() {
    let store = TrainingStore::in_memory(Arc::new(HashingEmbedder::new()))
        .await
        .unwrap();
    let record = TrainingRecord::ddl(
        "CREATE TABLE customers (id INT PRIMARY KEY, name VARCHAR(100), city VARCHAR(100))",
    );

    let first = store.add(&record).await.unwrap();
    let second = store.add(&record).await.unwrap();

    assert_eq!(first, second);
    assert!(first.ends_with("-ddl"));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove() {
    let store = TrainingStore::in_memory(Arc::new(HashingEmbedder::new()))
        .await
        .unwrap();
    let id = store
        .add(&TrainingRecord::documentation(
            "This query shows total revenue grouped by category for the last 3 months.",
        ))
        .await
        .unwrap();

    assert!(store.remove(&id).await.unwrap());
    assert!(!store.remove(&id).await.unwrap());
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_similar_ranks_related_entries_first() {
    let store = TrainingStore::in_memory(Arc::new(HashingEmbedder::new()))
        .await
        .unwrap();
    store
        .add(&TrainingRecord::ddl(
            "CREATE TABLE products (id INT, category VARCHAR(50), price NUMERIC)",
        ))
        .await
        .unwrap();
    store
        .add(&TrainingRecord::ddl(
            "CREATE TABLE customers (id INT, name VARCHAR(100), city VARCHAR(100))",
        ))
        .await
        .unwrap();
    store
        .add(&TrainingRecord::documentation("customers live in a city"))
        .await
        .unwrap();

    let hits = store
        .similar(TrainingKind::Ddl, "customers name city", 10)
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert!(hits[0].content.contains("customers"));
    assert!(hits.iter().all(|h| h.kind == TrainingKind::Ddl));

    let top = store
        .similar(TrainingKind::Ddl, "customers name city", 1)
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id, hits[0].id);
}

#[tokio::test]
async fn test_questions_newest_first() {
    let store = TrainingStore::in_memory(Arc::new(HashingEmbedder::new()))
        .await
        .unwrap();
    store
        .add(&TrainingRecord::question_sql(
            "Show me details of Alice",
            "select * from customers where name='Alice'",
        ))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store
        .add(&TrainingRecord::question_sql(
            "How many customers are there?",
            "select count(*) from customers",
        ))
        .await
        .unwrap();

    let questions = store.questions(10).await.unwrap();
    assert_eq!(
        questions,
        vec![
            "How many customers are there?".to_string(),
            "Show me details of Alice".to_string(),
        ]
    );
    assert_eq!(store.questions(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("training.db");
    let path = path.to_str().unwrap();

    let store = open(path).await;
    let id = assert_ok!(
        store
            .add(&TrainingRecord::question_sql(
                "List all customers in New York",
                "SELECT * FROM customers WHERE city = 'New York'",
            ))
            .await
    );
    store.close().await;

    let reopened = open(path).await;
    let entries = reopened.list().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, id);
    assert_eq!(
        entries[0].question.as_deref(),
        Some("List all customers in New York")
    );
    assert_eq!(
        entries[0].content,
        "SELECT * FROM customers WHERE city = 'New York'"
    );
}

#[tokio::test]
async fn test_list_groups_by_kind() {
    let store = TrainingStore::in_memory(Arc::new(HashingEmbedder::new()))
        .await
        .unwrap();
    store
        .add(&TrainingRecord::documentation("revenue = price * quantity"))
        .await
        .unwrap();
    store
        .add(&TrainingRecord::ddl("CREATE TABLE orders (id INT)"))
        .await
        .unwrap();

    let kinds: Vec<TrainingKind> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(kinds, vec![TrainingKind::Ddl, TrainingKind::Documentation]);
}

#[tokio::test]
async fn test_similar_ignores_entries_from_another_embedder() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("training.db");
    let path = path.to_str().unwrap();

    let store = open(path).await;
    assert_ok!(
        store
            .add(&TrainingRecord::ddl(
                "CREATE TABLE customers (id INT, name VARCHAR(100), city VARCHAR(100))",
            ))
            .await
    );
    store.close().await;

    let reopened = TrainingStore::open(path, Arc::new(RenamedEmbedder(HashingEmbedder::new())))
        .await
        .unwrap();
    let hits = reopened
        .similar(TrainingKind::Ddl, "customers name city", 10)
        .await
        .unwrap();
    assert!(hits.is_empty());
    // Still listed, just not retrieved
    assert_eq!(reopened.list().await.unwrap().len(), 1);

    reopened
        .add(&TrainingRecord::ddl("CREATE TABLE orders (id INT, customer_id INT)"))
        .await
        .unwrap();
    let hits = reopened
        .similar(TrainingKind::Ddl, "customers name city", 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].content.contains("orders"));
}
