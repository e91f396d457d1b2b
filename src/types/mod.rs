//! Core data types for the text-to-SQL service.
//!
//! - `SchemaDescription`: tables and columns supplied with a question
//! - `Text2SqlError`: error type for all operations
//! - `Result`: convenient result type alias

pub mod error;
pub mod schema;

pub use error::{Result, Text2SqlError};
pub use schema::{Column, SchemaDescription, Table};
