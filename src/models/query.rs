//! Query-related data models.

use crate::error::{DbError, DbResult, ErrorKind};
use serde_json::Value as JsonValue;

/// One result row: column name to value, in result-set column order.
pub type Row = serde_json::Map<String, JsonValue>;

/// Normalized result of executing one SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The statement produced a result set (possibly empty).
    Rows(Vec<Row>),
    /// The statement produced no result set; rows the engine reports as affected.
    AffectedCount(u64),
    Failure(DbError),
}

impl QueryOutcome {
    /// Error category of a failed outcome.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failure(err) => Some(err.kind()),
            _ => None,
        }
    }
}

impl From<DbResult<QueryOutcome>> for QueryOutcome {
    fn from(result: DbResult<QueryOutcome>) -> Self {
        result.unwrap_or_else(QueryOutcome::Failure)
    }
}

impl From<DbError> for QueryOutcome {
    fn from(err: DbError) -> Self {
        QueryOutcome::Failure(err)
    }
}
