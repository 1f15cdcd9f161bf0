//! OpenAI-compatible HTTP backend.
//!
//! Covers `POST {base_url}/chat/completions` and `POST {base_url}/embeddings`.
//! Works against hosted providers and against local servers that speak the
//! same protocol (Ollama serves it under `http://localhost:11434/v1`).

use crate::embedding::Embedder;
use crate::error::{AssistantError, AssistantResult};
use crate::llm::{ChatMessage, ChatModel};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Shared HTTP plumbing for the OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http_client: ReqwestClient,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> AssistantResult<Self> {
        Self::with_timeout(base_url, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> AssistantResult<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AssistantError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> AssistantResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(AssistantError::llm(
                format!("{} returned {}: {}", url, status, body),
                match status.as_u16() {
                    401 | 403 => "Check the API key",
                    404 => "Check the base URL and that the model is available",
                    429 => "The provider is rate limiting requests; try again later",
                    _ => "Check the LLM server logs",
                },
            ));
        }

        Ok(response.json::<R>().await?)
    }
}

// =============================================================================
// Chat Completions
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat model served by an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: OpenAiClient,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(client: OpenAiClient, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn submit(&self, messages: &[ChatMessage]) -> AssistantResult<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let response: ChatCompletionResponse =
            self.client.post_json("/chat/completions", &request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                AssistantError::llm(
                    "Response contained no choices",
                    "Check that the model supports chat completions",
                )
            })?;

        debug!(chars = content.len(), "Received completion");
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// =============================================================================
// Embeddings
// =============================================================================

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding model served by an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> AssistantResult<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbeddingResponse = self.client.post_json("/embeddings", &request).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| {
                AssistantError::llm(
                    "Embedding response contained no data",
                    "Check that the embedding model name is correct",
                )
            })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiClient::new("http://localhost:11434/v1/", "ollama").unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_chat_request_shape() {
        let messages = vec![ChatMessage::system("be terse"), ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "llama3",
            messages: &messages,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama3");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_chat_response_without_content() {
        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"role": "assistant"}}]}"#).unwrap();
        assert!(response.choices[0].message.content.is_none());
    }
}
