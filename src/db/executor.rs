//! Query execution engine.
//!
//! This module provides query execution functionality with support for:
//! - Parameterized queries
//! - A hard row cap, enforced while streaming (at most `cap + 1` rows are read;
//!   the connection is then closed rather than drained)
//! - Query timeouts
//!
//! The executor does not validate SQL. Caller-authored statements must pass
//! through [`crate::tools::query::safe_query`] instead of calling it directly.

use crate::db::params::bind_all;
use crate::db::pool::DatabasePool;
use crate::db::types;
use crate::error::{DbError, DbResult};
use crate::models::{MAX_RESULT_ROWS, QueryParam, QueryResult};
use futures_util::TryStreamExt;
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Executor, Postgres, Statement};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    query_timeout: Duration,
    row_cap: usize,
}

impl QueryExecutor {
    /// Create an executor with the given per-statement timeout.
    pub fn new(query_timeout: Duration) -> Self {
        Self {
            query_timeout,
            row_cap: MAX_RESULT_ROWS,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn row_cap(&self) -> usize {
        self.row_cap
    }

    /// Execute a row-returning statement on a borrowed connection.
    ///
    /// The connection is returned to the pool when this call completes. If
    /// the statement times out, or the result was truncated, the connection
    /// is closed instead: the server may still be sending rows on it.
    pub async fn execute_select(
        &self,
        pool: &DatabasePool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        debug!(
            sql = %sql,
            params = params.len(),
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let mut conn = pool.acquire().await?;

        let outcome = with_timeout("query execution", self.query_timeout, async {
            let (rows, truncated) = fetch_capped(&mut conn, sql, params, self.row_cap).await?;
            let fields = match rows.first() {
                Some(row) => types::column_names(row),
                None => describe_fields(&mut conn, sql).await?,
            };
            Ok::<_, DbError>((rows, truncated, fields))
        })
        .await;

        let (rows, truncated, fields) = match outcome {
            Ok(parts) => parts,
            Err(err @ DbError::Timeout { .. }) => {
                discard(conn, "timed out").await;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if truncated {
            warn!(limit = self.row_cap, "Query result truncated");
            // The unread remainder is still in flight on this connection.
            discard(conn, "truncated").await;
        }

        Ok(QueryResult {
            fields,
            rows: rows.iter().map(types::row_to_values).collect(),
            truncated,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Stream rows, keeping at most `cap`. Reports whether more rows existed.
async fn fetch_capped(
    conn: &mut PgConnection,
    sql: &str,
    params: &[QueryParam],
    cap: usize,
) -> DbResult<(Vec<PgRow>, bool)> {
    // Agent SQL is rarely repeated; don't keep it in the statement cache.
    let mut stream = bind_all(sql, params).persistent(false).fetch(&mut *conn);

    let mut rows = Vec::new();
    while let Some(row) = stream.try_next().await? {
        if rows.len() == cap {
            return Ok((rows, true));
        }
        rows.push(row);
    }
    Ok((rows, false))
}

/// Upper bound on a graceful close before the socket is simply dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Close a connection that must not go back to the pool.
async fn discard(conn: PoolConnection<Postgres>, reason: &str) {
    match timeout(CLOSE_TIMEOUT, conn.close()).await {
        Ok(Ok(())) => debug!(reason, "Closed connection"),
        Ok(Err(e)) => debug!(reason, error = %e, "Failed to close connection"),
        Err(_) => debug!(reason, "Connection close timed out; dropped"),
    }
}

/// Column names for a statement that produced no rows.
async fn describe_fields(conn: &mut PgConnection, sql: &str) -> DbResult<Vec<String>> {
    let statement = (&mut *conn).prepare(sql).await?;
    Ok(statement
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect())
}

/// Run `fut`, failing with a timeout error once `limit` elapses.
pub(crate) async fn with_timeout<T>(
    operation: &str,
    limit: Duration,
    fut: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(DbError::timeout(operation, limit.as_secs())),
    }
}
