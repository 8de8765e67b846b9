use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::prompt::PromptEntry;

/// Everything one completion call needs. Model and temperature come from the
/// generator that builds the request, never from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<PromptEntry>,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("failed to reach the model backend: {0}")]
    Request(#[source] reqwest::Error),
    #[error("model backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode model backend response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

// Structures matching Ollama's /api/chat endpoint
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptEntry],
    stream: bool, // We want the full response, not a stream
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaChatResponse {
    model: String,
    message: OllamaMessage,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize, Debug)]
struct OllamaMessage {
    content: String,
}

/// Ollama HTTP client. Cheap to share behind an `Arc` across sessions.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    chat_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let payload = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(&self.chat_url)
            .json(&payload)
            .send()
            .await
            .map_err(CompletionError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %body, "Ollama API request failed");
            return Err(CompletionError::Status { status, body });
        }

        let chat_response = response
            .json::<OllamaChatResponse>()
            .await
            .map_err(CompletionError::Decode)?;

        debug!(
            model = %chat_response.model,
            done = chat_response.done,
            chars = chat_response.message.content.len(),
            "Received Ollama response"
        );

        Ok(chat_response.message.content)
    }
}
