//! DB Agent MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools that let an AI
//! agent inspect a PostgreSQL schema and run single-statement SELECT queries
//! through a validating gate, with a hard cap of 1000 rows per result.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::DbAgentService;
