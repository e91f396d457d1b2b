//! Inference adapter: runs a prompt through a backend with a timeout and
//! cleans up the output.

use crate::llm::backend::{BackendKind, InferenceBackend};
use crate::llm::postprocess::normalize_quotes;
use crate::otel::{inference_span, record_inference_metrics, InferenceStatus};
use crate::prompt::Prompt;
use crate::types::{Result, Text2SqlError};
use std::time::{Duration, Instant};
use tracing::{warn, Instrument};

/// SQL produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSql {
    /// Generated statement (not validated)
    pub sql: String,
    /// Beam score of the chosen hypothesis (local backend only)
    pub confidence: Option<f32>,
    /// Time spent in the backend
    pub elapsed: Duration,
    /// Backend that produced the SQL
    pub backend: BackendKind,
}

/// Wraps backend calls with a timeout, instrumentation and post-processing.
#[derive(Debug, Clone, Copy)]
pub struct InferenceAdapter {
    timeout: Duration,
}

impl InferenceAdapter {
    /// Create an adapter with the given per-call timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Generate SQL for a prompt.
    ///
    /// # Arguments
    ///
    /// * `prompt` - Prompt built for the route
    /// * `backend` - Backend bound to the route
    /// * `max_output_tokens` - Route override; falls back to the backend default
    ///
    /// # Errors
    ///
    /// - `Text2SqlError::InferenceTimeout` if the call exceeds the timeout
    /// - `Text2SqlError::InferenceFailure` for backend errors or empty output
    pub async fn infer(
        &self,
        prompt: &Prompt,
        backend: &dyn InferenceBackend,
        max_output_tokens: Option<usize>,
    ) -> Result<GeneratedSql> {
        let kind = backend.kind();
        let max_tokens = max_output_tokens.unwrap_or_else(|| backend.default_max_output_tokens());
        let span = inference_span(kind, backend.model_name(), max_tokens);

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.timeout,
            backend
                .generate(prompt, max_tokens)
                .instrument(span.clone()),
        )
        .await;
        let elapsed = started.elapsed();

        let completion = match outcome {
            Err(_) => {
                record_inference_metrics(&span, InferenceStatus::Timeout, elapsed, None);
                warn!(backend = kind.as_str(), timeout_s = self.timeout.as_secs(), "inference timed out");
                return Err(Text2SqlError::InferenceTimeout(self.timeout));
            }
            Ok(Err(e)) => {
                record_inference_metrics(&span, InferenceStatus::Failed, elapsed, None);
                return Err(into_inference_failure(kind, e));
            }
            Ok(Ok(completion)) => completion,
        };

        if completion.text.trim().is_empty() {
            record_inference_metrics(&span, InferenceStatus::Failed, elapsed, None);
            return Err(Text2SqlError::inference(kind.as_str(), "model returned empty output"));
        }
        let sql = normalize_quotes(&completion.text);

        record_inference_metrics(&span, InferenceStatus::Success, elapsed, Some(sql.len()));
        Ok(GeneratedSql {
            sql,
            confidence: completion.score,
            elapsed,
            backend: kind,
        })
    }
}

/// Keep inference failures as they are; wrap anything else.
fn into_inference_failure(kind: BackendKind, err: Text2SqlError) -> Text2SqlError {
    match err {
        Text2SqlError::InferenceFailure { .. } | Text2SqlError::InferenceTimeout(_) => err,
        other => Text2SqlError::inference(kind.as_str(), other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::backend::Completion;
    use async_trait::async_trait;

    struct Fixed {
        output: std::result::Result<Completion, &'static str>,
        delay: Duration,
    }

    #[async_trait]
    impl InferenceBackend for Fixed {
        async fn generate(&self, _prompt: &Prompt, _max: usize) -> Result<Completion> {
            tokio::time::sleep(self.delay).await;
            match &self.output {
                Ok(c) => Ok(c.clone()),
                Err(m) => Err(Text2SqlError::config(*m)),
            }
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Local
        }

        fn model_name(&self) -> &str {
            "fixed"
        }

        fn default_max_output_tokens(&self) -> usize {
            16
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            system: String::new(),
            text: "Translate English to SQL: list users".to_string(),
        }
    }

    #[tokio::test]
    async fn test_only_double_quotes_change() {
        let backend = Fixed {
            output: Ok(Completion {
                text: " SELECT * FROM users WHERE name = \"bob\"\n".to_string(),
                score: Some(-0.25),
            }),
            delay: Duration::ZERO,
        };
        let adapter = InferenceAdapter::new(Duration::from_secs(5));

        let generated = adapter.infer(&prompt(), &backend, None).await.unwrap();
        assert_eq!(generated.sql, " SELECT * FROM users WHERE name = 'bob'\n");
        assert_eq!(generated.confidence, Some(-0.25));
        assert_eq!(generated.backend, BackendKind::Local);
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let backend = Fixed {
            output: Ok(Completion::text("   ")),
            delay: Duration::ZERO,
        };
        let err = InferenceAdapter::new(Duration::from_secs(5))
            .infer(&prompt(), &backend, Some(8))
            .await
            .unwrap_err();
        assert!(matches!(err, Text2SqlError::InferenceFailure { backend: "local", .. }));
    }

    #[tokio::test]
    async fn test_other_errors_become_inference_failures() {
        let backend = Fixed {
            output: Err("tokenizer missing"),
            delay: Duration::ZERO,
        };
        let err = InferenceAdapter::new(Duration::from_secs(5))
            .infer(&prompt(), &backend, None)
            .await
            .unwrap_err();
        match err {
            Text2SqlError::InferenceFailure { message, .. } => {
                assert!(message.contains("tokenizer missing"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let backend = Fixed {
            output: Ok(Completion::text("SELECT 1")),
            delay: Duration::from_secs(5),
        };
        let err = InferenceAdapter::new(Duration::from_millis(50))
            .infer(&prompt(), &backend, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Text2SqlError::InferenceTimeout(d) if d == Duration::from_millis(50)));
    }
}
