//! Schema to text rendering.

use crate::prompt::template::SchemaStyle;
use crate::types::{SchemaDescription, Table};

/// Render every table of `schema` in `style`, joined by the style's separator.
pub fn render_schema(schema: &SchemaDescription, style: SchemaStyle) -> String {
    schema
        .tables
        .iter()
        .map(|table| render_table(table, style))
        .collect::<Vec<_>>()
        .join(style.separator())
}

/// Render a single table.
pub fn render_table(table: &Table, style: SchemaStyle) -> String {
    match style {
        SchemaStyle::Sentences => sentence(table),
        SchemaStyle::CreateTable => create_table(table),
        SchemaStyle::ColumnList => column_list(table),
    }
}

fn sentence(table: &Table) -> String {
    if table.columns.is_empty() {
        return format!("Table {}.", table.name);
    }
    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    format!("Table {} has columns {}.", table.name, names.join(", "))
}

fn create_table(table: &Table) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.column_type).trim_end().to_string())
        .collect();

    if let Some(pk) = &table.primary_key {
        parts.push(format!("PRIMARY KEY ({})", pk));
    }

    for column in &table.columns {
        if let Some((ref_table, ref_column)) = column.foreign_key_target() {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                column.name, ref_table, ref_column
            ));
        }
    }

    format!("CREATE TABLE {} ({});", table.name, parts.join(", "))
}

fn column_list(table: &Table) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            let mut desc = if c.column_type.is_empty() {
                c.name.clone()
            } else {
                format!("{} ({})", c.name, c.column_type)
            };
            if let Some((ref_table, ref_column)) = c.foreign_key_target() {
                desc.push_str(&format!(" [FK to {}.{}]", ref_table, ref_column));
            }
            desc
        })
        .collect();

    format!("Table {}: {}", table.name, columns.join(", "))
        .trim_end()
        .to_string()
}
