//! Hosted chat-completion backend (OpenAI-compatible APIs: OpenAI, Groq, ...).

use crate::config::RemoteApiConfig;
use crate::llm::backend::{BackendKind, Completion, InferenceBackend};
use crate::llm::postprocess::strip_sql_markdown;
use crate::prompt::Prompt;
use crate::types::{Result, Text2SqlError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

/// Chat-completion response (only the fields we read).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Remote chat-completion client.
pub struct RemoteChatClient {
    kind: BackendKind,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_output_tokens: usize,
    client: Client,
}

impl RemoteChatClient {
    /// Create a client from configuration.
    ///
    /// # Arguments
    ///
    /// * `kind` - Configured backend this client serves (`Remote` or `Groq`)
    /// * `config` - API settings
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::ConfigError` if no API key is set
    pub fn new(kind: BackendKind, config: &RemoteApiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Text2SqlError::config(format!("{} backend requires an API key", kind.as_str()))
            })?;

        Ok(Self {
            kind,
            api_key,
            model: config.model.clone(),
            endpoint: Self::endpoint_for(&config.base_url),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            client: Client::new(),
        })
    }

    /// Resolve the chat-completions URL.
    ///
    /// Accepts either an API base (`https://api.openai.com/v1`) or a full
    /// endpoint URL (`https://api.groq.com/openai/v1/chat/completions`).
    pub fn endpoint_for(base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}/chat/completions", base)
        }
    }

    /// Chat-completions URL in use.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Two-message request body (system instruction + user prompt).
    pub fn request_body(&self, prompt: &Prompt, max_output_tokens: usize) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.text}
            ],
            "temperature": self.temperature,
            "max_tokens": max_output_tokens
        })
    }

    /// Extract the first choice's text from a response body.
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::InferenceFailure` if the body is malformed,
    /// has no choices, or the content is empty
    pub fn parse_response(&self, body: &str) -> Result<String> {
        let backend = self.kind.as_str();
        let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
            Text2SqlError::inference(backend, format!("failed to parse response: {}", e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Text2SqlError::inference(backend, "no choices returned"))?
            .message
            .content
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(Text2SqlError::inference(backend, "empty completion"));
        }

        Ok(content)
    }
}

#[async_trait]
impl InferenceBackend for RemoteChatClient {
    async fn generate(&self, prompt: &Prompt, max_output_tokens: usize) -> Result<Completion> {
        tracing::debug!(endpoint = %self.endpoint, model = %self.model, "sending chat completion");
        let backend = self.kind.as_str();

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, max_output_tokens))
            .send()
            .await
            .map_err(|e| Text2SqlError::inference(backend, format!("request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Text2SqlError::inference(backend, format!("failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(Text2SqlError::inference(
                backend,
                format!("API error {}: {}", status, body),
            ));
        }

        let content = self.parse_response(&body)?;
        Ok(Completion::text(strip_sql_markdown(&content)))
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn default_max_output_tokens(&self) -> usize {
        self.max_output_tokens
    }
}
