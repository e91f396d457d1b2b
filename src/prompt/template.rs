//! Prompt templates and schema rendering styles.

use serde::{Deserialize, Serialize};

/// Outer prompt template wrapping the question (and schema block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    /// `Translate English to SQL: {q}` (T5 fine-tuning format)
    Translate,
    /// `### Question: {q}\n### SQL Query:`
    QuestionBlock,
    /// Multi-line instruction for chat-completion models
    Instruction,
}

/// How each table of a schema is rendered into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStyle {
    /// `Table users has columns id, name.`
    #[default]
    Sentences,
    /// Reconstructed `CREATE TABLE` with key constraints
    CreateTable,
    /// `Table users: id (INTEGER), name (TEXT)`
    ColumnList,
}

/// Template plus schema style, i.e. one complete prompt format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptVariant {
    /// Outer template
    pub template: PromptTemplate,
    /// Schema rendering
    pub schema_style: SchemaStyle,
}

impl PromptTemplate {
    /// Template name as used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::QuestionBlock => "question_block",
            Self::Instruction => "instruction",
        }
    }
}

impl SchemaStyle {
    /// Separator placed between rendered tables.
    pub fn separator(&self) -> &'static str {
        match self {
            Self::Sentences | Self::CreateTable => " ",
            Self::ColumnList => "\n",
        }
    }
}

impl PromptVariant {
    /// Create a prompt variant.
    pub fn new(template: PromptTemplate, schema_style: SchemaStyle) -> Self {
        Self {
            template,
            schema_style,
        }
    }
}

/// System message sent with the prompt to chat backends.
///
/// # Arguments
///
/// * `with_schema` - Whether the prompt embeds a schema block
pub fn system_message(with_schema: bool) -> &'static str {
    if with_schema {
        "You are a SQL expert. Convert natural language queries to valid SQL based on the provided schema."
    } else {
        "You are a SQL expert. Convert natural language queries to valid SQL statements. Return only the SQL code without any explanation."
    }
}

impl Default for PromptVariant {
    fn default() -> Self {
        Self::new(PromptTemplate::Translate, SchemaStyle::Sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_names_round_trip_through_serde() {
        let template: PromptTemplate = serde_yaml::from_str("question_block").unwrap();
        assert_eq!(template, PromptTemplate::QuestionBlock);
        assert_eq!(template.as_str(), "question_block");

        let style: SchemaStyle = serde_yaml::from_str("create_table").unwrap();
        assert_eq!(style, SchemaStyle::CreateTable);
    }

    #[test]
    fn test_system_message_depends_on_schema() {
        assert!(system_message(true).contains("provided schema"));
        assert!(system_message(false).contains("Return only the SQL code"));
        assert_ne!(system_message(true), system_message(false));
    }
}
