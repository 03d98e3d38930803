//! Hosted language-model clients.
//!
//! `LlmClient` hides the transport so the classifier can be exercised against
//! a canned response in tests.

use super::error::{ClassifyError, ClassifyResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings for the hosted classification model.
#[derive(Clone, PartialEq)]
pub struct ClassifierConfig {
    /// OpenAI-compatible chat-completions URL
    pub api_url: String,
    /// Bearer token; `None` disables classification
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
}

impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_url: crate::config::DEFAULT_LLM_API_URL.to_string(),
            api_key: None,
            model: crate::config::DEFAULT_LLM_MODEL.to_string(),
            temperature: crate::config::DEFAULT_LLM_TEMPERATURE,
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send `prompt` and return the raw completion text.
    async fn complete(&self, prompt: &str) -> ClassifyResult<String>;

    /// Model name used for requests.
    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: ClassifierConfig,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> ClassifyResult<String> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ClassifyError::NotConfigured(
                "set --llm-api-key, DATAGOV_LLM_API_KEY or OPENAI_API_KEY".to_string(),
            )
        })?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
        };

        debug!(url = %self.config.api_url, model = %self.config.model, "Sending classification request");

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::Protocol(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ClassifyError::EmptyResponse)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// A client that answers every prompt with a fixed response.
#[cfg(test)]
pub struct MockLlmClient {
    response: String,
    should_fail: bool,
}

#[cfg(test)]
impl MockLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            should_fail: true,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _prompt: &str) -> ClassifyResult<String> {
        if self.should_fail {
            Err(ClassifyError::Transport("Mock failure".to_string()))
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
