//! Tracing setup and inference instrumentation.
//!
//! # Inference Span Conventions
//!
//! **Span naming**: `text_to_sql {model}`
//!
//! **Attributes**:
//! - `gen_ai.system`: Backend family (`local` or `remote`)
//! - `gen_ai.request.model`: Model identifier
//! - `gen_ai.request.max_tokens`: Output token limit
//! - `text2sql.inference.status`: `success`, `failed` or `timeout`
//! - `text2sql.inference.duration_ms`: Wall time of the backend call
//!
//! HTTP request spans come from `tower_http::trace::TraceLayer` and carry a
//! `request_id`.

pub mod inference;
pub mod init;

pub use inference::{inference_span, record_inference_metrics, InferenceStatus};
pub use init::{init_tracing, TracingGuard};
