//! Inference backend abstraction.

use crate::prompt::Prompt;
use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configured backend, selected per route in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Locally loaded seq2seq model
    Local,
    /// Hosted chat-completion API (`remote` section, OpenAI by default)
    Remote,
    /// Groq chat-completion API (`groq` section)
    Groq,
}

impl BackendKind {
    /// Backend name as used in configuration and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Groq => "groq",
        }
    }
}

/// Raw backend output before post-processing.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Generated text
    pub text: String,

    /// Length-normalized log-probability of the chosen sequence (local only)
    pub score: Option<f32>,
}

impl Completion {
    /// Completion without a score.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: None,
        }
    }
}

/// Something that turns a prompt into text.
///
/// Implementations must be safe for concurrent use; they are shared across
/// requests behind an `Arc`.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Generate a completion.
    ///
    /// # Arguments
    ///
    /// * `prompt` - Prompt text and system message
    /// * `max_output_tokens` - Upper bound on generated tokens
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::InferenceFailure` on any backend error
    async fn generate(&self, prompt: &Prompt, max_output_tokens: usize) -> Result<Completion>;

    /// Backend family.
    fn kind(&self) -> BackendKind;

    /// Model identifier (for logs and spans).
    fn model_name(&self) -> &str;

    /// Output token limit used when a route does not set one.
    fn default_max_output_tokens(&self) -> usize;
}
