use crate::Method;
use std::time::Duration;
use thiserror::Error;

/// Every failure Quarry can report.
///
/// Driver failures are carried verbatim inside [`Error::Driver`] and never retried.
#[derive(Debug, Error)]
pub enum Error {
    /// A non growable destination without any record.
    #[error("empty dataset: a fixed destination must contain at least one record")]
    EmptyDataset,
    /// A growable destination that cannot be appended to.
    #[error("destination is not addressable: only `Growable(&mut Vec<_>)` can receive new records")]
    NotAddressable,
    /// Malformed model definition or builder argument.
    #[error("malformed model: {0}")]
    Extraction(String),
    #[error("destination is read-only and cannot receive scanned rows")]
    NotSettable,
    #[error("the model is query-only and cannot be used for {0}")]
    QueryOnly(Method),
    #[error("table name is required")]
    MissingTable,
    #[error("multiple rows update requires an index field")]
    MissingIndex,
    #[error("row {row} does not provide the same columns as row 0")]
    HeterogeneousRows { row: usize },
    #[error("cannot compose statement: {0}")]
    Composition(String),
    #[error("column `{column}` could not be decoded: {reason}")]
    Scan { column: String, reason: String },
    #[error(transparent)]
    Driver(#[from] anyhow::Error),
    #[error("statement did not complete within {0:?}")]
    Timeout(Duration),
    #[error("no transaction in progress")]
    NoTransaction,
}

impl Error {
    /// Errors caused by a wrong model definition rather than by a runtime condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingTable | Error::MissingIndex)
    }

    /// True for the extraction family: empty dataset, not addressable and malformed model.
    pub fn is_extraction(&self) -> bool {
        matches!(
            self,
            Error::EmptyDataset | Error::NotAddressable | Error::Extraction(..)
        )
    }

    /// Copy of a deferred builder error. Driver errors are not cloneable and keep
    /// only their message.
    pub(crate) fn duplicate(&self) -> Error {
        match self {
            Error::EmptyDataset => Error::EmptyDataset,
            Error::NotAddressable => Error::NotAddressable,
            Error::Extraction(m) => Error::Extraction(m.clone()),
            Error::NotSettable => Error::NotSettable,
            Error::QueryOnly(method) => Error::QueryOnly(*method),
            Error::MissingTable => Error::MissingTable,
            Error::MissingIndex => Error::MissingIndex,
            Error::HeterogeneousRows { row } => Error::HeterogeneousRows { row: *row },
            Error::Composition(m) => Error::Composition(m.clone()),
            Error::Scan { column, reason } => Error::Scan {
                column: column.clone(),
                reason: reason.clone(),
            },
            Error::Driver(e) => Error::Driver(anyhow::anyhow!("{e:#}")),
            Error::Timeout(limit) => Error::Timeout(*limit),
            Error::NoTransaction => Error::NoTransaction,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
