//! Question + schema to prompt text.

use crate::prompt::schema_text::render_schema;
use crate::prompt::template::{system_message, PromptTemplate, PromptVariant};
use crate::types::{Result, SchemaDescription, Text2SqlError};

/// Error message returned for an empty question.
pub const EMPTY_QUERY_MESSAGE: &str = "Query cannot be empty";

/// Prompt ready for a backend.
///
/// Seq2seq backends only read `text`; chat backends send `system` as the
/// system message and `text` as the user message.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// System instruction (chat backends)
    pub system: String,
    /// Prompt text
    pub text: String,
}

/// Build the prompt text for a question.
///
/// # Arguments
///
/// * `query` - Natural language question
/// * `schema` - Optional schema; an empty table list counts as absent
/// * `variant` - Template and schema style
///
/// # Errors
///
/// Returns `Text2SqlError::InvalidInput` if `query` is empty or blank
pub fn build_prompt(
    query: &str,
    schema: Option<&SchemaDescription>,
    variant: PromptVariant,
) -> Result<String> {
    if query.trim().is_empty() {
        return Err(Text2SqlError::invalid_input(EMPTY_QUERY_MESSAGE));
    }

    let schema_text = schema
        .filter(|s| !s.is_empty())
        .map(|s| render_schema(s, variant.schema_style));

    let text = match (variant.template, schema_text) {
        (PromptTemplate::Translate, None) => format!("Translate English to SQL: {}", query),
        (PromptTemplate::Translate, Some(schema)) => {
            format!("Schema: {}. Translate English to SQL: {}", schema, query)
        }
        (PromptTemplate::QuestionBlock, None) => {
            format!("### Question: {}\n### SQL Query:", query)
        }
        (PromptTemplate::QuestionBlock, Some(schema)) => format!(
            "### Schema: {}\n### Question: {}\n### SQL Query:",
            schema, query
        ),
        (PromptTemplate::Instruction, None) => {
            format!("Convert this natural language query to SQL: {}", query)
        }
        (PromptTemplate::Instruction, Some(schema)) => format!(
            "Given the following database schema:\n\n{}\n\n\
             Convert this natural language query to a valid SQL statement:\n\"{}\"\n\n\
             Return only the SQL code without any explanation.",
            schema, query
        ),
    };

    Ok(text)
}

/// Build the prompt together with its chat system message.
pub fn build_chat_prompt(
    query: &str,
    schema: Option<&SchemaDescription>,
    variant: PromptVariant,
) -> Result<Prompt> {
    let with_schema = schema.is_some_and(|s| !s.is_empty());
    let text = build_prompt(query, schema, variant)?;
    Ok(Prompt {
        system: system_message(with_schema).to_string(),
        text,
    })
}
