use crate::Value;
use futures::stream::BoxStream;
use std::future::Future;

/// Errors at the driver boundary, wrapped verbatim into [`crate::Error::Driver`].
pub type DriverResult<T> = anyhow::Result<T>;

/// Rows produced by a query, as raw column bytes.
pub type RowStream<'a> = BoxStream<'a, DriverResult<RawRow>>;

/// Outcome of a statement that does not return rows.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    pub rows_affected: u64,
    pub last_affected_id: Option<i64>,
    pub warnings: u32,
}

/// One scanned row, columns in projection order, `None` being SQL `NULL`.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub columns: Box<[Option<Box<[u8]>>]>,
}

impl RawRow {
    pub fn new(columns: impl IntoIterator<Item = Option<Box<[u8]>>>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    pub fn column(&self, index: usize) -> Option<&[u8]> {
        self.columns.get(index).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Runs SQL text with positional parameters.
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = DriverResult<RowsAffected>> + Send;

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> RowStream<'a>;
}

/// A connection (or pool) usable concurrently through a shared reference.
pub trait Connection: Executor + 'static {
    type Prepared: Prepared;
    type Transaction: Transaction<Prepared = Self::Prepared>;

    /// Prepares `sql` on the connection.
    fn prepare(&self, sql: &str) -> impl Future<Output = DriverResult<Self::Prepared>> + Send;

    fn begin(&self) -> impl Future<Output = DriverResult<Self::Transaction>> + Send;
}

/// A transaction, used by one flow of control at a time.
pub trait Transaction: Executor {
    type Prepared: Prepared;

    /// Binds a statement prepared on the connection to this transaction.
    fn bind(&self, prepared: &Self::Prepared) -> DriverResult<Self::Prepared>;

    fn commit(self) -> impl Future<Output = DriverResult<()>> + Send;

    fn rollback(self) -> impl Future<Output = DriverResult<()>> + Send;
}

/// A prepared statement handle, cheap to clone.
pub trait Prepared: Clone + Send + Sync + 'static {
    fn execute(&self, params: &[Value]) -> impl Future<Output = DriverResult<RowsAffected>> + Send;

    fn query<'a>(&'a self, params: &'a [Value]) -> RowStream<'a>;
}
