//! Schema description supplied alongside a question.
//!
//! The canonical wire format is camelCase:
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "orders",
//!       "primaryKey": "id",
//!       "columns": [
//!         {"name": "id", "type": "INTEGER"},
//!         {"name": "user_id", "type": "INTEGER", "isForeignKey": true,
//!          "referencedTable": "users", "referencedColumn": "id"}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! [`SchemaDescription::from_value`] never fails: unknown shapes degrade to an
//! empty table list and nameless tables or columns are skipped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered collection of tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescription {
    /// Tables in declaration order
    #[serde(default)]
    pub tables: Vec<Table>,
}

/// Single table description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// Table name
    pub name: String,

    /// Columns in declaration order
    #[serde(default)]
    pub columns: Vec<Column>,

    /// Primary key column name
    #[serde(default, alias = "primary_key", skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

/// Single column description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name
    pub name: String,

    /// Declared SQL type (may be empty)
    #[serde(default, rename = "type", alias = "column_type")]
    pub column_type: String,

    /// Whether the column references another table
    #[serde(default, alias = "is_foreign_key")]
    pub is_foreign_key: bool,

    /// Referenced table (foreign keys only)
    #[serde(default, alias = "referenced_table", skip_serializing_if = "Option::is_none")]
    pub referenced_table: Option<String>,

    /// Referenced column (foreign keys only)
    #[serde(default, alias = "referenced_column", skip_serializing_if = "Option::is_none")]
    pub referenced_column: Option<String>,
}

impl SchemaDescription {
    /// Parse a schema from arbitrary JSON, best effort.
    ///
    /// Accepts `{"tables": [...]}`, a bare table array, or a
    /// `{"schema": {...}}` wrapper. Anything else yields an empty schema.
    pub fn from_value(value: &Value) -> Self {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(map) => match map.get("tables") {
                Some(Value::Array(items)) => items,
                _ => {
                    return map
                        .get("schema")
                        .map(Self::from_value)
                        .unwrap_or_default();
                }
            },
            _ => return Self::default(),
        };

        Self {
            tables: items.iter().filter_map(Table::from_value).collect(),
        }
    }

    /// `true` if there are no tables to render.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Table {
    /// Create a table with the given columns and no primary key.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: None,
        }
    }

    /// Set the primary key column.
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = str_field(obj, &["name", "table_name"])?.to_string();

        let columns = obj
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| cols.iter().filter_map(Column::from_value).collect())
            .unwrap_or_default();

        let primary_key = str_field(obj, &["primaryKey", "primary_key"]).map(str::to_string);

        Some(Self {
            name,
            columns,
            primary_key,
        })
    }
}

impl Column {
    /// Create a plain (non-foreign-key) column.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            ..Default::default()
        }
    }

    /// Mark the column as a foreign key to `table.column`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.is_foreign_key = true;
        self.referenced_table = Some(table.into());
        self.referenced_column = Some(column.into());
        self
    }

    /// Referenced `(table, column)` when the foreign key is complete.
    ///
    /// Returns `None` for plain columns and for foreign keys whose target is
    /// missing, so renderers can skip the clause instead of failing.
    pub fn foreign_key_target(&self) -> Option<(&str, &str)> {
        if !self.is_foreign_key {
            return None;
        }
        let table = self.referenced_table.as_deref().filter(|s| !s.is_empty())?;
        let column = self.referenced_column.as_deref().filter(|s| !s.is_empty())?;
        Some((table, column))
    }

    fn from_value(value: &Value) -> Option<Self> {
        // Spider-style bare column names
        if let Some(name) = value.as_str().filter(|s| !s.is_empty()) {
            return Some(Self::new(name, ""));
        }

        let obj = value.as_object()?;
        let name = str_field(obj, &["name", "column_name"])?.to_string();
        let column_type = str_field(obj, &["type", "column_type"])
            .unwrap_or_default()
            .to_string();
        let is_foreign_key = ["isForeignKey", "is_foreign_key"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_bool))
            .unwrap_or(false);

        Some(Self {
            name,
            column_type,
            is_foreign_key,
            referenced_table: str_field(obj, &["referencedTable", "referenced_table"])
                .map(str::to_string),
            referenced_column: str_field(obj, &["referencedColumn", "referenced_column"])
                .map(str::to_string),
        })
    }
}

/// First non-empty string value among `keys`.
fn str_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_format() {
        let schema = SchemaDescription::from_value(&json!({
            "tables": [{
                "name": "orders",
                "primaryKey": "id",
                "columns": [
                    {"name": "id", "type": "INTEGER"},
                    {"name": "user_id", "type": "INTEGER", "isForeignKey": true,
                     "referencedTable": "users", "referencedColumn": "id"}
                ]
            }]
        }));

        assert_eq!(schema.tables.len(), 1);
        let orders = &schema.tables[0];
        assert_eq!(orders.primary_key.as_deref(), Some("id"));
        assert_eq!(orders.columns[1].foreign_key_target(), Some(("users", "id")));
    }

    #[test]
    fn test_schema_wrapper_and_bare_array() {
        let wrapped = SchemaDescription::from_value(&json!({
            "schema": {"tables": [{"name": "users", "columns": ["id", "age"]}]}
        }));
        let bare = SchemaDescription::from_value(&json!([
            {"name": "users", "columns": ["id", "age"]}
        ]));

        assert_eq!(wrapped, bare);
        assert_eq!(wrapped.tables[0].columns[1].name, "age");
        assert_eq!(wrapped.tables[0].columns[1].column_type, "");
    }

    #[test]
    fn test_unknown_shapes_degrade_to_empty() {
        assert!(SchemaDescription::from_value(&json!({"foo": 1})).is_empty());
        assert!(SchemaDescription::from_value(&json!("users")).is_empty());
        assert!(SchemaDescription::from_value(&json!({"tables": "users"})).is_empty());
        assert!(SchemaDescription::from_value(&Value::Null).is_empty());
    }

    #[test]
    fn test_nameless_entries_are_skipped() {
        let schema = SchemaDescription::from_value(&json!({
            "tables": [
                {"columns": [{"name": "id"}]},
                {"name": "users", "columns": [{"type": "TEXT"}, {"name": "email"}]}
            ]
        }));

        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.tables[0].columns.len(), 1);
        assert_eq!(schema.tables[0].columns[0].name, "email");
    }

    #[test]
    fn test_incomplete_foreign_key_has_no_target() {
        let schema = SchemaDescription::from_value(&json!({
            "tables": [{"name": "orders", "columns": [
                {"name": "user_id", "isForeignKey": true, "referencedTable": "users"}
            ]}]
        }));

        let column = &schema.tables[0].columns[0];
        assert!(column.is_foreign_key);
        assert_eq!(column.foreign_key_target(), None);
    }

    #[test]
    fn test_snake_case_aliases_deserialize() {
        let schema: SchemaDescription = serde_json::from_value(json!({
            "tables": [{"name": "orders", "primary_key": "id", "columns": [
                {"name": "user_id", "type": "INT", "is_foreign_key": true,
                 "referenced_table": "users", "referenced_column": "id"}
            ]}]
        }))
        .unwrap();

        assert_eq!(schema.tables[0].primary_key.as_deref(), Some("id"));
        assert_eq!(schema.tables[0].columns[0].foreign_key_target(), Some(("users", "id")));
    }
}
