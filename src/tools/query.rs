//! Query execution tool.
//!
//! This module holds the query gate ([`safe_query`]), the single entry point
//! for caller-authored SQL, and the `query_database` MCP tool built on it.
//! The tool never fails the call for a bad or failing query: the outcome is
//! always a structured result with `ok` set accordingly.

use crate::db::{DatabasePool, QueryExecutor};
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, QueryResult};
use crate::tools::sql_validator;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

/// Shortest `query` text the tool accepts, in characters.
pub const MIN_QUERY_LEN: usize = 5;

/// Message returned in place of the underlying error.
pub const GENERIC_FAILURE_MESSAGE: &str = "Query failed validation or execution.";

/// Validate caller-supplied SQL and execute it under the row cap.
///
/// Rejected statements never reach the pool: no connection is acquired and
/// nothing is sent to the server.
pub async fn safe_query(
    executor: &QueryExecutor,
    pool: &DatabasePool,
    sql: &str,
    params: &[QueryParam],
) -> DbResult<QueryResult> {
    let sql = sql_validator::validate_select(sql)?;
    executor.execute_select(pool, sql, params).await
}

/// Collapse runs of whitespace to one space and drop a single trailing `;`.
///
/// Only one semicolon is removed, so `SELECT 1;;` still reaches the gate
/// with a semicolon in it.
pub fn normalize_query(query: &str) -> String {
    let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.strip_suffix(';') {
        Some(stripped) => stripped.trim_end().to_string(),
        None => collapsed,
    }
}

/// Input for the query_database tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryDatabaseInput {
    /// A single SELECT statement. One trailing semicolon is tolerated; any other semicolon is rejected.
    #[schemars(length(min = 5))]
    pub query: String,
}

/// Row count and truncation flag for a successful query.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct QueryMeta {
    pub row_count: usize,
    /// True if the query produced more rows than the 1000 returned
    pub truncated: bool,
}

/// Output from the query_database tool.
///
/// `ok: true` carries `fields`, `results` and `meta`; `ok: false` carries
/// `error` and, when enabled, `detail`.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct QueryDatabaseOutput {
    pub ok: bool,
    /// Column names in result order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Rows as arrays aligned with `fields`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Vec<JsonValue>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<QueryMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw underlying error message. May reveal schema details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl QueryDatabaseOutput {
    pub fn success(result: QueryResult) -> Self {
        let meta = QueryMeta {
            row_count: result.row_count(),
            truncated: result.truncated,
        };
        Self {
            ok: true,
            fields: Some(result.fields),
            results: Some(result.rows),
            meta: Some(meta),
            error: None,
            detail: None,
        }
    }

    pub fn failure(err: &DbError, expose_detail: bool) -> Self {
        Self {
            ok: false,
            fields: None,
            results: None,
            meta: None,
            error: Some(GENERIC_FAILURE_MESSAGE.to_string()),
            detail: expose_detail.then(|| err.detail()),
        }
    }
}

/// Handler for query execution.
pub struct QueryToolHandler {
    pool: Arc<DatabasePool>,
    executor: QueryExecutor,
    expose_error_detail: bool,
}

impl QueryToolHandler {
    pub fn new(pool: Arc<DatabasePool>, executor: QueryExecutor, expose_error_detail: bool) -> Self {
        Self {
            pool,
            executor,
            expose_error_detail,
        }
    }

    /// Parameter-level validation, reported as a protocol error rather than
    /// an `ok: false` result.
    pub fn check_input(input: &QueryDatabaseInput) -> DbResult<()> {
        if input.query.chars().count() < MIN_QUERY_LEN {
            return Err(DbError::invalid_input(format!(
                "query must be at least {} characters",
                MIN_QUERY_LEN
            )));
        }
        Ok(())
    }

    /// Handle the query_database tool call.
    pub async fn query_database(&self, input: QueryDatabaseInput) -> QueryDatabaseOutput {
        let sql = normalize_query(&input.query);

        match safe_query(&self.executor, &self.pool, &sql, &[]).await {
            Ok(result) => {
                info!(
                    row_count = result.row_count(),
                    truncated = result.truncated,
                    elapsed_ms = result.execution_time_ms,
                    "Query executed"
                );
                QueryDatabaseOutput::success(result)
            }
            Err(err) if err.is_rejection() => {
                warn!(
                    keyword = %sql_validator::leading_keyword(&sql),
                    reason = %err.detail(),
                    "Query rejected"
                );
                QueryDatabaseOutput::failure(&err, self.expose_error_detail)
            }
            Err(err) => {
                warn!(error = %err, "Query failed");
                QueryDatabaseOutput::failure(&err, self.expose_error_detail)
            }
        }
    }
}
