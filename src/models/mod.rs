//! Data models for the DB agent MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

pub use query::{MAX_RESULT_ROWS, QueryParam, QueryResult};
pub use schema::{ColumnInfo, DEFAULT_SCHEMA};
