//! Schema introspection module.
//!
//! Catalog queries for the listing tools. Every query here is a fixed,
//! developer-authored statement; caller input only ever reaches them as a
//! bound parameter, never as SQL text, so they bypass the query gate.
//!
//! # Architecture
//!
//! SQL text lives in the `queries` submodule. Each statement casts its output
//! columns to `text`: `information_schema` exposes domain types
//! (`sql_identifier`, `character_data`, `yes_or_no`) the driver will not
//! decode as `String` directly.

use crate::db::executor::with_timeout;
use crate::db::pool::DatabasePool;
use crate::error::{DbError, DbResult};
use crate::models::ColumnInfo;
use std::time::Duration;
use tracing::debug;

mod queries {
    pub const LIST_DATABASES: &str = r#"
        SELECT datname::text
        FROM pg_database
        WHERE datistemplate = false
        AND datallowconn = true
        ORDER BY datname
        "#;

    pub const LIST_TABLES: &str = r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = $1
        AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            column_name::text,
            data_type::text,
            is_nullable::text
        FROM information_schema.columns
        WHERE table_schema = $1
        AND table_name = $2
        ORDER BY ordinal_position
        "#;
}

/// Schema inspector for database introspection.
#[derive(Debug, Clone)]
pub struct SchemaInspector {
    query_timeout: Duration,
}

impl SchemaInspector {
    pub fn new(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }

    /// Databases that are not templates and accept connections.
    pub async fn list_databases(&self, pool: &DatabasePool) -> DbResult<Vec<String>> {
        let mut conn = pool.acquire().await?;
        let databases = with_timeout("list databases", self.query_timeout, async {
            Ok::<_, DbError>(sqlx::query_scalar::<_, String>(queries::LIST_DATABASES)
                .fetch_all(&mut *conn)
                .await?)
        })
        .await?;

        debug!(count = databases.len(), "Listed PostgreSQL databases");
        Ok(databases)
    }

    /// Base tables in `schema`, ordered by name.
    pub async fn list_tables(&self, pool: &DatabasePool, schema: &str) -> DbResult<Vec<String>> {
        let mut conn = pool.acquire().await?;
        let tables = with_timeout("list tables", self.query_timeout, async {
            Ok::<_, DbError>(sqlx::query_scalar::<_, String>(queries::LIST_TABLES)
                .bind(schema)
                .fetch_all(&mut *conn)
                .await?)
        })
        .await?;

        debug!(count = tables.len(), schema = schema, "Listed PostgreSQL tables");
        Ok(tables)
    }

    /// Columns of `schema.table` in declaration order.
    ///
    /// An unknown table yields an empty list rather than an error, matching
    /// what the catalog reports.
    pub async fn list_columns(
        &self,
        pool: &DatabasePool,
        schema: &str,
        table: &str,
    ) -> DbResult<Vec<ColumnInfo>> {
        let mut conn = pool.acquire().await?;
        let rows = with_timeout("list columns", self.query_timeout, async {
            Ok::<_, DbError>(
                sqlx::query_as::<_, (String, String, String)>(queries::LIST_COLUMNS)
                    .bind(schema)
                    .bind(table)
                    .fetch_all(&mut *conn)
                    .await?,
            )
        })
        .await?;

        let columns: Vec<ColumnInfo> = rows
            .into_iter()
            .map(|(name, data_type, nullable)| ColumnInfo::new(name, data_type, nullable))
            .collect();

        debug!(
            count = columns.len(),
            schema = schema,
            table = table,
            "Listed PostgreSQL columns"
        );
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_queries_bind_parameters() {
        assert!(queries::LIST_TABLES.contains("$1"));
        assert!(queries::LIST_COLUMNS.contains("$1"));
        assert!(queries::LIST_COLUMNS.contains("$2"));
        assert!(!queries::LIST_DATABASES.contains('$'));
    }

    #[test]
    fn test_list_tables_restricted_and_ordered() {
        assert!(queries::LIST_TABLES.contains("'BASE TABLE'"));
        assert!(queries::LIST_TABLES.contains("ORDER BY table_name"));
    }

    #[test]
    fn test_list_columns_ordinal_order() {
        assert!(queries::LIST_COLUMNS.contains("ORDER BY ordinal_position"));
    }

    #[test]
    fn test_list_databases_excludes_templates() {
        assert!(queries::LIST_DATABASES.contains("datistemplate = false"));
        assert!(queries::LIST_DATABASES.contains("datallowconn = true"));
    }

    #[tokio::test]
    async fn test_unreachable_database_is_connection_error() {
        use crate::config::{DatabaseConfig, PoolOptions};
        let options = PoolOptions {
            acquire_timeout_secs: 1,
            ..PoolOptions::default()
        };
        let config = DatabaseConfig::parse("postgres://127.0.0.1:1/app", options).unwrap();
        let pool = DatabasePool::connect_lazy(&config).unwrap();

        let inspector = SchemaInspector::new(Duration::from_secs(5));
        let err = inspector.list_databases(&pool).await.unwrap_err();
        assert!(!err.is_rejection());
    }
}
