//! Schema-related data models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Schema searched when the caller does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

/// One column of a table as reported by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub column_name: String,
    /// Declared type as the catalog reports it (e.g. "integer", "character varying")
    pub data_type: String,
    /// "YES" or "NO"
    pub is_nullable: String,
}

impl ColumnInfo {
    pub fn new(
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        is_nullable: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: is_nullable.into(),
        }
    }
}
