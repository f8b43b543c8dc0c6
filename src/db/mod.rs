//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management
//! - Capped query execution
//! - Schema introspection
//! - Type mappings

pub mod executor;
pub(crate) mod params;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::DatabasePool;
pub use schema::SchemaInspector;
