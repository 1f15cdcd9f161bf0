//! Chat/completion backends.
//!
//! The assistant talks to a language model through the [`ChatModel`] trait.
//! Two implementations exist:
//! - `openai`: any OpenAI-compatible HTTP API (hosted providers, or a local
//!   Ollama server through its `/v1` endpoint)
//! - `ollama`: the native Ollama generation API

pub mod ollama;
pub mod openai;

pub use ollama::OllamaChat;
pub use openai::{OpenAiChat, OpenAiClient, OpenAiEmbedder};

use crate::error::AssistantResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A language model that answers a conversation with text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn submit(&self, messages: &[ChatMessage]) -> AssistantResult<String>;

    /// Model identifier for logging.
    fn model(&self) -> &str;
}
