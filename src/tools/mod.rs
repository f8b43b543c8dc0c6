//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: the query gate and the `query_database` tool
//! - `schema`: `list_databases`, `list_tables` and `list_columns`
//! - `sql_validator`: SELECT-only, single-statement check for caller SQL

pub mod query;
pub mod schema;
pub mod sql_validator;

pub use query::{QueryDatabaseInput, QueryDatabaseOutput, QueryToolHandler, safe_query};
pub use schema::{
    ListColumnsInput, ListColumnsOutput, ListDatabasesOutput, ListTablesInput, ListTablesOutput,
    SchemaToolHandler,
};
