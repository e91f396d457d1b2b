//! Prompt construction from a question and an optional schema.

pub mod builder;
pub mod schema_text;
pub mod template;

pub use builder::{build_chat_prompt, build_prompt, Prompt, EMPTY_QUERY_MESSAGE};
pub use schema_text::render_schema;
pub use template::{system_message, PromptTemplate, PromptVariant, SchemaStyle};
