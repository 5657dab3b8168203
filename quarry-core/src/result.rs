use crate::{Error, Result, RowsAffected};
use std::fmt::{self, Display};

/// Uniform outcome of every builder operation.
///
/// On failure `error` is set and every counter is zero, partial success is never
/// reported.
#[derive(Default, Debug)]
pub struct QueryResult {
    pub affected_rows: i64,
    pub last_insert_id: i64,
    /// Records written by a query, or the counted rows of a count.
    pub returned_rows: i64,
    pub warning: u32,
    pub error: Option<Error>,
}

impl QueryResult {
    pub fn failed(error: Error) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn returned(rows: i64) -> Self {
        Self {
            returned_rows: rows,
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

impl From<RowsAffected> for QueryResult {
    fn from(value: RowsAffected) -> Self {
        Self {
            affected_rows: value.rows_affected as i64,
            last_insert_id: value.last_affected_id.unwrap_or_default(),
            warning: value.warnings,
            ..Default::default()
        }
    }
}

impl From<Result<QueryResult>> for QueryResult {
    fn from(value: Result<QueryResult>) -> Self {
        value.unwrap_or_else(QueryResult::failed)
    }
}

impl Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(e) => write!(f, "error: {e}"),
            None => write!(
                f,
                "affected: {}, last insert id: {}, returned: {}, warnings: {}",
                self.affected_rows, self.last_insert_id, self.returned_rows, self.warning
            ),
        }
    }
}
