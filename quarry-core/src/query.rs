use crate::{
    AsValue, Clause, Clauses, Connection, EntityDescriptor, Error, LockMode, Method, Operator,
    Prepared, QueryResult, Result, Session, Statement, Value, materialize,
};
use futures::TryStreamExt;
use std::{borrow::Cow, collections::BTreeMap};

/// Fluent builder over the records passed to [`Session::model`].
///
/// Clause setters return `&mut Self` and can be chained, operations are async and
/// report their outcome as a [`QueryResult`].
///
/// ```rust,ignore
/// let mut people = Vec::<Person>::new();
/// let result = session
///     .model(Growable(&mut people))
///     .filter(Operator::And, "`AGE`>?", [18])
///     .order_by("`NAME`")
///     .query()
///     .await;
/// ```
pub struct QueryBuilder<'s, 'r, C: Connection> {
    session: &'s mut Session<C>,
    descriptor: Option<EntityDescriptor<'r>>,
    pending: Option<Error>,
    clauses: Clauses,
    prepare_next: bool,
    batch_mode: bool,
}

impl<'s, 'r, C: Connection> QueryBuilder<'s, 'r, C> {
    pub(crate) fn new(session: &'s mut Session<C>, descriptor: Result<EntityDescriptor<'r>>) -> Self {
        let (descriptor, pending) = match descriptor {
            Ok(descriptor) => (Some(descriptor), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            session,
            descriptor,
            pending,
            clauses: Default::default(),
            prepare_next: false,
            batch_mode: false,
        }
    }

    pub fn descriptor(&self) -> Option<&EntityDescriptor<'r>> {
        self.descriptor.as_ref()
    }

    pub fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    fn update_descriptor(&mut self, f: impl FnOnce(&mut EntityDescriptor<'r>) -> Result<()>) {
        if let Some(descriptor) = self.descriptor.as_mut()
            && let Err(e) = f(descriptor)
            && self.pending.is_none()
        {
            self.pending = Some(e);
        }
    }

    /// Targets `name` instead of the table of the model.
    pub fn table(&mut self, name: impl Into<Cow<'static, str>>) -> &mut Self {
        let name = name.into();
        self.update_descriptor(|d| {
            d.retarget(name);
            Ok(())
        });
        self
    }

    pub fn alias(&mut self, alias: impl Into<Cow<'static, str>>) -> &mut Self {
        let alias = alias.into();
        self.update_descriptor(|d| {
            d.alias = Some(alias);
            Ok(())
        });
        self
    }

    /// Appends a join fragment, written verbatim after the FROM table.
    pub fn join(&mut self, fragment: impl Into<Cow<'static, str>>) -> &mut Self {
        let fragment = fragment.into();
        self.update_descriptor(|d| {
            d.joins.push(fragment);
            Ok(())
        });
        self
    }

    /// Appends a condition. A `,,,,` token in `template` expands to one placeholder per value.
    pub fn filter<V: Into<Value>>(
        &mut self,
        operator: Operator,
        template: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        let values = values.into_iter().map(Into::into).collect();
        self.clauses
            .filters
            .push(Clause::new(operator, template, values));
        self
    }

    pub fn clear_filters(&mut self) -> &mut Self {
        self.clauses.filters.clear();
        self
    }

    /// Appends an assignment written verbatim in the SET list of an update.
    pub fn set<V: Into<Value>>(
        &mut self,
        template: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        let clause = Clause::new(
            Operator::And,
            template,
            values.into_iter().map(Into::into).collect(),
        );
        self.update_descriptor(|d| {
            d.set_clauses.push(clause);
            Ok(())
        });
        self
    }

    pub fn group_by(&mut self, expression: &str) -> &mut Self {
        self.clauses.group_by = Some(expression.to_owned());
        self
    }

    pub fn having(&mut self, expression: &str) -> &mut Self {
        self.clauses.having = Some(expression.to_owned());
        self
    }

    pub fn order_by(&mut self, expression: &str) -> &mut Self {
        self.clauses.order_by = Some(expression.to_owned());
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.clauses.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.clauses.offset = Some(offset);
        self
    }

    pub fn lock(&mut self, lock: LockMode) -> &mut Self {
        self.clauses.lock = lock;
        self
    }

    /// Uses the field at `position` as index field, in addition to the declared ones.
    pub fn index_with(&mut self, position: usize) -> &mut Self {
        self.update_descriptor(|d| d.index_with(position));
        self
    }

    /// Assigns the field at `position` on update even when it holds its null sentinel.
    pub fn ignore_null(&mut self, position: usize) -> &mut Self {
        self.update_descriptor(|d| d.ignore_null(position));
        self
    }

    /// Runs the following operations through prepared statements.
    pub fn prepare_next(&mut self, prepare: bool) -> &mut Self {
        self.prepare_next = prepare;
        self
    }

    /// Routes `insert` and `update` to their map valued batch variants.
    pub fn batch_mode(&mut self, batch: bool) -> &mut Self {
        self.batch_mode = batch;
        self
    }

    /// Appends a row to the batch. The value under `INDEX` identifies the row on batch update.
    pub fn append_batch_value<K, V>(&mut self, row: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let row: BTreeMap<String, Value> = row
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.update_descriptor(|d| {
            d.batch_rows.push(row);
            Ok(())
        });
        self
    }

    pub fn clear_batch_values(&mut self) -> &mut Self {
        self.update_descriptor(|d| {
            d.batch_rows.clear();
            Ok(())
        });
        self
    }

    /// Appends `ON DUPLICATE KEY UPDATE` to inserts.
    pub fn on_duplicate_key_update(&mut self, upsert: bool) -> &mut Self {
        self.update_descriptor(|d| {
            d.upsert = upsert;
            Ok(())
        });
        self
    }

    /// Assigns `expression` to `column` when the insert hits a duplicate key.
    pub fn upsert_column(&mut self, column: &str, expression: &str) -> &mut Self {
        let (column, expression) = (column.to_owned(), expression.to_owned());
        self.update_descriptor(|d| {
            d.upsert_columns.insert(column, expression);
            Ok(())
        });
        self
    }

    /// Appends a table level fragment (keys, constraints) to `create_table`.
    pub fn table_schema(&mut self, fragment: impl Into<Cow<'static, str>>) -> &mut Self {
        let fragment = fragment.into();
        self.update_descriptor(|d| {
            d.schema_fragments.push(fragment);
            Ok(())
        });
        self
    }

    /// Applies a reusable customization.
    pub fn scope(&mut self, f: impl FnOnce(&mut Self)) -> &mut Self {
        f(self);
        self
    }

    /// The statement `method` would run, without running it.
    pub fn statement(&self, method: Method) -> Result<Statement> {
        if let Some(e) = &self.pending {
            return Err(e.duplicate());
        }
        let descriptor = self.descriptor.as_ref().ok_or(Error::EmptyDataset)?;
        self.session
            .writer()
            .compose(method, descriptor, &self.clauses)
    }

    fn compose(&mut self, method: Method) -> Result<Statement> {
        if let Some(e) = self.pending.take() {
            return Err(e);
        }
        let statement = self.statement(method)?;
        log::debug!("{method}: {}", statement.sql);
        log::trace!("Parameters: {:?}", statement.params);
        Ok(statement)
    }

    pub async fn insert(&mut self) -> QueryResult {
        let method = if self.batch_mode {
            Method::BatchInsert
        } else {
            Method::Insert
        };
        self.run(method).await
    }

    /// Fills the records with the selected rows.
    pub async fn query(&mut self) -> QueryResult {
        self.run(Method::Select).await
    }

    pub async fn update(&mut self) -> QueryResult {
        let method = if self.batch_mode {
            Method::BatchUpdate
        } else {
            Method::Update
        };
        self.run(method).await
    }

    pub async fn delete(&mut self) -> QueryResult {
        self.run(Method::Delete).await
    }

    /// Counts the matching rows into [`QueryResult::returned_rows`].
    pub async fn count(&mut self) -> QueryResult {
        self.run(Method::Count).await
    }

    pub async fn batch_insert(&mut self) -> QueryResult {
        self.run(Method::BatchInsert).await
    }

    pub async fn batch_update(&mut self) -> QueryResult {
        self.run(Method::BatchUpdate).await
    }

    pub async fn create_table(&mut self) -> QueryResult {
        self.run(Method::CreateTable).await
    }

    async fn run(&mut self, method: Method) -> QueryResult {
        let result = match method {
            Method::Select => self.fetch().await,
            Method::Count => self.count_rows().await,
            method => self.modify(method).await,
        };
        result.unwrap_or_else(|e| {
            log::error!("{:#}", e);
            QueryResult::failed(e)
        })
    }

    async fn modify(&mut self, method: Method) -> Result<QueryResult> {
        let statement = self.compose(method)?;
        let session = &mut *self.session;
        let affected = if self.prepare_next {
            let prepared = session.prepare(&statement.sql).await?;
            session
                .deadline(async {
                    prepared
                        .execute(&statement.params)
                        .await
                        .map_err(Error::Driver)
                })
                .await?
        } else {
            session.execute(&statement.sql, &statement.params).await?
        };
        Ok(affected.into())
    }

    async fn fetch(&mut self) -> Result<QueryResult> {
        if let Some(descriptor) = &self.descriptor
            && !descriptor.storage.is_settable()
        {
            return Err(Error::NotSettable);
        }
        let statement = self.compose(Method::Select)?;
        let session = &mut *self.session;
        let Some(descriptor) = self.descriptor.as_mut() else {
            return Err(Error::EmptyDataset);
        };
        let config = session.config().clone();
        let written = if self.prepare_next {
            let prepared = session.prepare(&statement.sql).await?;
            let rows = prepared.query(&statement.params);
            session
                .deadline(materialize(descriptor, rows, &config))
                .await?
        } else {
            let rows = session.query(&statement.sql, &statement.params);
            session
                .deadline(materialize(descriptor, rows, &config))
                .await?
        };
        Ok(QueryResult::returned(written as i64))
    }

    async fn count_rows(&mut self) -> Result<QueryResult> {
        let statement = self.compose(Method::Count)?;
        let session = &mut *self.session;
        let row = if self.prepare_next {
            let prepared = session.prepare(&statement.sql).await?;
            session
                .deadline(async {
                    let mut rows = prepared.query(&statement.params);
                    rows.try_next().await.map_err(Error::Driver)
                })
                .await?
        } else {
            session.query_row(&statement.sql, &statement.params).await?
        };
        let count = match row.as_ref().and_then(|row| row.column(0)) {
            Some(raw) => i64::decode(Some(raw), session.config())?,
            None => 0,
        };
        Ok(QueryResult::returned(count))
    }
}
