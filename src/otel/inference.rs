//! Inference call instrumentation.
//!
//! Spans follow the OpenTelemetry GenAI semantic conventions.

use crate::llm::BackendKind;
use std::time::Duration;
use tracing::{field, span, Level, Span};

/// Outcome of an inference call (maps to `text2sql.inference.status`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceStatus {
    /// Backend produced SQL
    Success,
    /// Backend returned an error or empty output
    Failed,
    /// Request timeout elapsed
    Timeout,
}

impl InferenceStatus {
    /// Get status name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }
}

/// Create an inference span.
///
/// # Arguments
///
/// * `backend` - Backend family
/// * `model` - Model identifier
/// * `max_tokens` - Output token limit for this call
///
/// # Returns
///
/// Tracing span with GenAI attributes; status and timing are recorded later
/// with `record_inference_metrics`
///
/// # Example
///
/// ```rust,ignore
/// let span = inference_span(BackendKind::Remote, "gpt-3.5-turbo", 512);
/// async { backend.generate(&prompt, 512).await }.instrument(span).await
/// ```
pub fn inference_span(backend: BackendKind, model: &str, max_tokens: usize) -> Span {
    span!(
        Level::INFO,
        "inference",
        otel.name = %format!("text_to_sql {}", model),
        otel.kind = "client",
        gen_ai.operation.name = "text_to_sql",
        gen_ai.system = backend.as_str(),
        gen_ai.request.model = model,
        gen_ai.request.max_tokens = max_tokens as u64,
        text2sql.inference.status = field::Empty,
        text2sql.inference.duration_ms = field::Empty,
        text2sql.sql.length = field::Empty,
    )
}

/// Record inference outcome on a span.
///
/// # Arguments
///
/// * `span` - Span created by `inference_span`
/// * `status` - Call outcome
/// * `elapsed` - Wall time of the call
/// * `sql_len` - Length of the generated SQL (successful calls)
pub fn record_inference_metrics(
    span: &Span,
    status: InferenceStatus,
    elapsed: Duration,
    sql_len: Option<usize>,
) {
    span.record("text2sql.inference.status", status.as_str());
    span.record("text2sql.inference.duration_ms", elapsed.as_millis() as u64);
    if let Some(len) = sql_len {
        span.record("text2sql.sql.length", len as u64);
    }
}
