use crate::{
    Config, Connection, Error, Executor, IntoRecords, MySqlWriter, PreparedCache, QueryBuilder,
    RawRow, Result, RowStream, RowsAffected, SqlWriter, Transaction, Value, extract,
};
use futures::{FutureExt, TryStreamExt, future::BoxFuture};
use std::{collections::HashMap, future::Future, panic, panic::AssertUnwindSafe, sync::Arc};

/// Executes statements on a connection, or on the transaction it holds.
///
/// Sessions cloned from one another (and the transactional sessions they begin)
/// share the connection, the configuration and one [`PreparedCache`]. Statements
/// bound to a transaction are kept in a cache local to the session, which never
/// outlives the transaction.
///
/// A session is used by one flow of control at a time, share the connection by
/// cloning the session instead.
pub struct Session<C: Connection> {
    connection: Arc<C>,
    transaction: Option<C::Transaction>,
    shared: Arc<PreparedCache<C::Prepared>>,
    local: HashMap<String, C::Prepared>,
    config: Arc<Config>,
    writer: Arc<dyn SqlWriter>,
}

impl<C: Connection> Session<C> {
    pub fn new(connection: C) -> Self {
        Self::with_config(connection, Config::default())
    }

    pub fn with_config(connection: C, config: Config) -> Self {
        Self {
            connection: Arc::new(connection),
            transaction: None,
            shared: Arc::new(PreparedCache::new()),
            local: HashMap::new(),
            config: Arc::new(config),
            writer: Arc::new(MySqlWriter::new()),
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn writer(&self) -> &dyn SqlWriter {
        self.writer.as_dyn()
    }

    pub fn shared_cache(&self) -> &PreparedCache<C::Prepared> {
        &self.shared
    }

    pub fn is_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Starts a builder on `records`. Extraction errors are reported by the first operation.
    pub fn model<'s, 'r, R>(&'s mut self, records: R) -> QueryBuilder<'s, 'r, C>
    where
        R: IntoRecords<'r>,
        R::Model: 'r,
    {
        QueryBuilder::new(self, extract(records))
    }

    /// Applies the configured statement timeout to `future`.
    pub(crate) async fn deadline<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => future.await,
        }
    }

    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<RowsAffected> {
        self.deadline(async {
            match &self.transaction {
                Some(transaction) => transaction.execute(sql, params).await,
                None => self.connection.execute(sql, params).await,
            }
            .map_err(Error::Driver)
        })
        .await
    }

    pub fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> RowStream<'a> {
        match &self.transaction {
            Some(transaction) => transaction.query(sql, params),
            None => self.connection.query(sql, params),
        }
    }

    /// First row returned by `sql`, if any.
    pub async fn query_row(&self, sql: &str, params: &[Value]) -> Result<Option<RawRow>> {
        self.deadline(async {
            let mut rows = self.query(sql, params);
            rows.try_next().await.map_err(Error::Driver)
        })
        .await
    }

    /// Resolves `sql` to a prepared handle.
    ///
    /// The session cache is checked first, then the shared cache which prepares the
    /// text on the connection when missing. Inside a transaction the shared handle is
    /// bound to the transaction and the bound handle is kept in the session cache.
    pub async fn prepare(&mut self, sql: &str) -> Result<C::Prepared> {
        if let Some(prepared) = self.local.get(sql) {
            return Ok(prepared.clone());
        }
        let connection = &self.connection;
        let prepared = self
            .deadline(self.shared.get_or_insert(sql, || async move {
                log::debug!("Preparing: {sql}");
                connection.prepare(sql).await.map_err(Error::Driver)
            }))
            .await?;
        let Some(transaction) = &self.transaction else {
            return Ok(prepared);
        };
        let bound = transaction.bind(&prepared)?;
        self.local.insert(sql.to_owned(), bound.clone());
        Ok(bound)
    }

    /// Opens a transaction in a new session with an empty session cache.
    pub async fn begin(&self) -> Result<Session<C>> {
        let transaction = self
            .deadline(async { self.connection.begin().await.map_err(Error::Driver) })
            .await?;
        Ok(Session {
            connection: self.connection.clone(),
            transaction: Some(transaction),
            shared: self.shared.clone(),
            local: HashMap::new(),
            config: self.config.clone(),
            writer: self.writer.clone(),
        })
    }

    /// Commits the transaction, the session is then usable without transaction.
    pub async fn commit(&mut self) -> Result<()> {
        let transaction = self.transaction.take().ok_or(Error::NoTransaction)?;
        self.local.clear();
        transaction.commit().await.map_err(|e| {
            log::error!("{:#}", e);
            Error::Driver(e)
        })
    }

    /// Rolls back the transaction, the session is then usable without transaction.
    pub async fn rollback(&mut self) -> Result<()> {
        let transaction = self.transaction.take().ok_or(Error::NoTransaction)?;
        self.local.clear();
        transaction.rollback().await.map_err(|e| {
            log::error!("{:#}", e);
            Error::Driver(e)
        })
    }

    /// Runs `f` in a new transaction: commits when it returns `Ok`, rolls back when it
    /// returns `Err` or panics. A panic is resumed once the rollback completed.
    ///
    /// ```rust,ignore
    /// session
    ///     .transaction(|tx| {
    ///         async move { tx.model(&mut person).insert().await.into_result() }.boxed()
    ///     })
    ///     .await?;
    /// ```
    pub async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'s> FnOnce(&'s mut Session<C>) -> BoxFuture<'s, Result<T>>,
    {
        let mut session = self.begin().await?;
        let outcome = AssertUnwindSafe(f(&mut session)).catch_unwind().await;
        match outcome {
            Ok(Ok(value)) => {
                session.commit().await?;
                Ok(value)
            }
            Ok(Err(e)) => {
                let _ = session.rollback().await;
                Err(e)
            }
            Err(payload) => {
                let _ = session.rollback().await;
                panic::resume_unwind(payload)
            }
        }
    }
}

impl<C: Connection> Clone for Session<C> {
    /// A session on the same connection, without transaction and with an empty session cache.
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            transaction: None,
            shared: self.shared.clone(),
            local: HashMap::new(),
            config: self.config.clone(),
            writer: self.writer.clone(),
        }
    }
}
