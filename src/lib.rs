//! Text2SQL - natural-language questions to SQL over HTTP.
//!
//! A question (optionally with a database schema) becomes a prompt, the prompt
//! runs through a local T5 model or a hosted chat-completion API, and the
//! cleaned-up SQL is returned. The service never executes or validates SQL.

pub mod config;
pub mod llm;
pub mod otel;
pub mod prompt;
pub mod server;
pub mod types;

// Re-export main types
pub use config::Config;
pub use llm::{BackendKind, GeneratedSql, InferenceAdapter, InferenceBackend};
pub use prompt::{build_prompt, Prompt, PromptTemplate, PromptVariant, SchemaStyle};
pub use server::{router, serve, AppState, RouteName};
pub use types::{Column, Result, SchemaDescription, Table, Text2SqlError};
