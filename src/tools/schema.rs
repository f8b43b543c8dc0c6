//! Schema introspection tools.
//!
//! This module implements the `list_databases`, `list_tables` and
//! `list_columns` MCP tools. Failures propagate as MCP errors; only
//! `query_database` folds them into its result.

use crate::db::{DatabasePool, SchemaInspector};
use crate::error::DbResult;
use crate::models::{ColumnInfo, DEFAULT_SCHEMA};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

/// Input for the list_tables tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Schema to list base tables from. Default: "public"
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl Default for ListTablesInput {
    fn default() -> Self {
        Self {
            schema: default_schema(),
        }
    }
}

/// Input for the list_columns tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListColumnsInput {
    /// Schema containing the table. Default: "public"
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Name of the table to describe
    #[serde(rename = "tableName")]
    pub table_name: String,
}

/// Output for the list_databases tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListDatabasesOutput {
    /// Names of databases that accept connections (templates excluded)
    pub databases: Vec<String>,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    /// Base table names in ascending order
    pub tables: Vec<String>,
}

/// Output from the list_columns tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListColumnsOutput {
    /// Columns in declaration order
    pub columns: Vec<ColumnInfo>,
}

pub struct SchemaToolHandler {
    pool: Arc<DatabasePool>,
    inspector: SchemaInspector,
}

impl SchemaToolHandler {
    pub fn new(pool: Arc<DatabasePool>, query_timeout: Duration) -> Self {
        Self {
            pool,
            inspector: SchemaInspector::new(query_timeout),
        }
    }

    pub async fn list_databases(&self) -> DbResult<ListDatabasesOutput> {
        let databases = self.inspector.list_databases(&self.pool).await?;

        info!(count = databases.len(), "Listed databases");
        Ok(ListDatabasesOutput { databases })
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let tables = self.inspector.list_tables(&self.pool, &input.schema).await?;

        info!(schema = %input.schema, count = tables.len(), "Listed tables");
        Ok(ListTablesOutput { tables })
    }

    pub async fn list_columns(&self, input: ListColumnsInput) -> DbResult<ListColumnsOutput> {
        let columns = self
            .inspector
            .list_columns(&self.pool, &input.schema, &input.table_name)
            .await?;

        info!(
            schema = %input.schema,
            table = %input.table_name,
            columns = columns.len(),
            "Listed columns"
        );
        Ok(ListColumnsOutput { columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_tables_schema_defaults_to_public() {
        let input: ListTablesInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.schema, "public");
        assert_eq!(input.schema, ListTablesInput::default().schema);
    }

    #[test]
    fn test_list_tables_explicit_schema() {
        let input: ListTablesInput = serde_json::from_str(r#"{"schema": "sales"}"#).unwrap();
        assert_eq!(input.schema, "sales");
    }

    #[test]
    fn test_list_columns_uses_camel_case_table_name() {
        let input: ListColumnsInput = serde_json::from_str(r#"{"tableName": "users"}"#).unwrap();
        assert_eq!(input.table_name, "users");
        assert_eq!(input.schema, "public");
    }

    #[test]
    fn test_list_columns_requires_table_name() {
        assert!(serde_json::from_str::<ListColumnsInput>(r#"{"schema": "public"}"#).is_err());
        assert!(serde_json::from_str::<ListColumnsInput>(r#"{"table_name": "users"}"#).is_err());
    }

    #[test]
    fn test_list_columns_schema_marks_table_name_required() {
        let schema = serde_json::to_value(schemars::schema_for!(ListColumnsInput)).unwrap();
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&serde_json::json!("tableName")));
        assert!(!required.contains(&serde_json::json!("schema")));
        assert_eq!(schema["properties"]["schema"]["default"], "public");
    }

    #[test]
    fn test_list_columns_output_shape() {
        let output = ListColumnsOutput {
            columns: vec![ColumnInfo::new("id", "integer", "NO")],
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "columns": [{"column_name": "id", "data_type": "integer", "is_nullable": "NO"}]
            })
        );
    }
}
