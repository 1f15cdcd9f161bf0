//! Native Ollama backend.

use crate::error::{AssistantError, AssistantResult};
use crate::llm::{ChatMessage, ChatModel, Role};
use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::models::ModelOptions;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Chat model served by Ollama's own generation API.
///
/// The system message becomes the generation system prompt; the rest of the
/// conversation is flattened into a single prompt.
pub struct OllamaChat {
    client: Ollama,
    model: String,
    temperature: f32,
}

impl OllamaChat {
    /// Create a backend for `host` (e.g. `http://localhost:11434`).
    pub fn new(host: &str, model: impl Into<String>, temperature: f32) -> AssistantResult<Self> {
        let (base, port) = split_host(host)?;
        Ok(Self {
            client: Ollama::builder().host(base.as_str()).port(port).build(),
            model: model.into(),
            temperature,
        })
    }

    fn options(&self) -> ModelOptions {
        ModelOptions::default().temperature(self.temperature)
    }
}

/// Split `scheme://host:port` into the parts the Ollama client expects.
fn split_host(host: &str) -> AssistantResult<(String, u16)> {
    let url = Url::parse(host)
        .map_err(|e| AssistantError::config(format!("Invalid Ollama host '{}': {}", host, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AssistantError::config(format!(
            "Ollama host '{}' must use http or https",
            host
        )));
    }
    let name = url
        .host_str()
        .ok_or_else(|| AssistantError::config(format!("Ollama host '{}' has no host name", host)))?;
    let port = url.port_or_known_default().unwrap_or(11434);
    Ok((format!("{}://{}", url.scheme(), name), port))
}

/// Flatten the non-system messages into one prompt.
fn flatten_prompt(messages: &[ChatMessage]) -> (Option<String>, String) {
    let system = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>();

    let conversation = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .collect::<Vec<_>>();

    // A lone user message goes through untouched
    let prompt = match conversation.as_slice() {
        [only] if only.role == Role::User => only.content.clone(),
        _ => conversation
            .iter()
            .map(|m| match m.role {
                Role::Assistant => format!("Assistant: {}", m.content),
                _ => format!("User: {}", m.content),
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
    };

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, prompt)
}

#[async_trait]
impl ChatModel for OllamaChat {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn submit(&self, messages: &[ChatMessage]) -> AssistantResult<String> {
        let (system, prompt) = flatten_prompt(messages);

        let mut request =
            GenerationRequest::new(self.model.clone(), prompt).options(self.options());
        if let Some(system) = system {
            request = request.system(system);
        }

        let response = self.client.generate(request).await.map_err(|e| {
            AssistantError::llm(
                format!("Ollama generation failed: {}", e),
                "Check that Ollama is running and the model is pulled",
            )
        })?;

        debug!(chars = response.response.len(), "Received completion");
        Ok(response.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
