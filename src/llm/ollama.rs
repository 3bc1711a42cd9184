//! Ollama client implementation
//!
//! Async HTTP client for an Ollama-compatible chat API. The agent's tool
//! protocol is carried inside the response text, so only non-streaming plain
//! chat is needed here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{Config, Message, Result, RubricError};
use crate::llm::traits::{CompletionClient, CompletionOptions};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: OllamaMessage,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.model.timeout_secs))
            .build()
            .map_err(|e| RubricError::model(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.model_url(),
            model: config.model.name.clone(),
        })
    }

    /// Create a client with custom base URL and model
    pub fn with_base_url(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| RubricError::model(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(
        &self,
        system: &str,
        history: &[Message],
        options: Option<CompletionOptions>,
    ) -> Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(OllamaMessage {
            role: "system".to_string(),
            content: system.to_string(),
        });
        messages.extend(history.iter().map(|m| OllamaMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        }));

        let request = ChatRequest {
            model: &self.model,
            messages,
            options: options.map(|o| OllamaOptions {
                temperature: o.temperature,
                num_predict: o.max_tokens,
            }),
            stream: false,
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RubricError::model(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RubricError::model(format!(
                "Model endpoint returned {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| RubricError::model(format!("Invalid response body: {}", e)))?;

        Ok(chat.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
