//! Query-related data models.
//!
//! This module defines types for SQL query parameters and results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Hard cap on rows returned from a single query.
pub const MAX_RESULT_ROWS: usize = 1000;

/// A positional parameter value bound as `$1`, `$2`, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    String(String),
}

/// Outcome of an admitted query.
///
/// Rows are positional: `rows[i][j]` is the value of `fields[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    /// True if the statement produced more rows than were kept.
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_from_json() {
        let params: Vec<QueryParam> = serde_json::from_str(r#"[null, true, 7, 1.5, "x"]"#).unwrap();
        assert_eq!(
            params,
            vec![
                QueryParam::Null,
                QueryParam::Bool(true),
                QueryParam::Int(7),
                QueryParam::Float(1.5),
                QueryParam::String("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_result_counts() {
        let result = QueryResult {
            fields: vec!["x".to_string()],
            rows: vec![vec![JsonValue::from(1)], vec![JsonValue::from(2)]],
            truncated: false,
            execution_time_ms: 3,
        };
        assert_eq!(result.row_count(), 2);
    }
}
