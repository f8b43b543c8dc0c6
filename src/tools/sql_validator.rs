//! SQL statement gate for caller-authored queries.
//!
//! The gate admits a statement only if, after trimming, it contains no
//! semicolon and begins with the keyword `SELECT` (any case) followed by
//! whitespace. It is a prefix check, not a parser: a read-only CTE starting
//! with `WITH` is refused, while `SELECT pg_sleep(100)` or a data-heavy
//! sub-select is admitted. Run the server with a read-only database role;
//! the gate narrows what an agent can send, it does not make it safe.

use crate::error::{DbError, DbResult, RejectReason};

const SELECT_KEYWORD: &str = "select";

/// Validate caller-supplied SQL and return the trimmed text to execute.
///
/// # Examples
///
/// ```
/// use db_agent_mcp::tools::sql_validator::validate_select;
///
/// assert_eq!(validate_select("  SELECT 1  ").unwrap(), "SELECT 1");
/// assert!(validate_select("SELECT 1; SELECT 2").is_err());
/// assert!(validate_select("DELETE FROM t").is_err());
/// ```
pub fn validate_select(sql: &str) -> DbResult<&str> {
    check(sql).map_err(DbError::rejected)
}

/// Same as [`validate_select`] but yields the bare reason.
pub fn check(sql: &str) -> Result<&str, RejectReason> {
    let cleaned = sql.trim();
    if cleaned.is_empty() {
        return Err(RejectReason::Empty);
    }
    if cleaned.contains(';') {
        return Err(RejectReason::MultipleStatements);
    }
    if !starts_with_select(cleaned) {
        return Err(RejectReason::NotSelect);
    }
    Ok(cleaned)
}

/// `SELECT` (case-insensitive) followed by at least one whitespace character.
fn starts_with_select(sql: &str) -> bool {
    let n = SELECT_KEYWORD.len();
    sql.get(..n)
        .is_some_and(|head| head.eq_ignore_ascii_case(SELECT_KEYWORD))
        && sql[n..].chars().next().is_some_and(char::is_whitespace)
}

/// First word of the statement, upper-cased, for log lines.
pub fn leading_keyword(sql: &str) -> String {
    sql.trim_start()
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default()
        .chars()
        .take(32)
        .collect::<String>()
        .to_uppercase()
}
