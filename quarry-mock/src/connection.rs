use crate::{Call, MockPrepared, MockTransaction, state::MockState};
use quarry_core::{
    Connection, DriverResult, Executor, RawRow, RowStream, RowsAffected, Value,
};
use std::sync::Arc;

/// In memory connection recording every call it receives.
///
/// Queries replay the result sets scripted with [`MockConnection::push_rows`], in
/// order, executes return the outcomes scripted with [`MockConnection::push_affected`].
/// Clones share the recorded calls and the scripts.
#[derive(Default, Debug, Clone)]
pub struct MockConnection {
    pub(crate) state: Arc<MockState>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result set of the next query.
    pub fn push_rows(&self, rows: impl IntoIterator<Item = RawRow>) -> &Self {
        self.state.push_rows(rows.into_iter().collect());
        self
    }

    /// Outcome of the next execute.
    pub fn push_affected(&self, affected: RowsAffected) -> &Self {
        self.state.push_affected(affected);
        self
    }

    /// Makes the next driver call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) -> &Self {
        self.state.push_failure(message.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls()
    }

    pub fn clear_calls(&self) {
        self.state.clear_calls();
    }

    /// SQL text of every execute and query, in order.
    pub fn statements(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Execute { .. } | Call::Query { .. }))
            .filter_map(|c| c.sql().map(ToOwned::to_owned))
            .collect()
    }

    fn count(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.state.calls().iter().filter(|c| f(c)).count()
    }

    pub fn prepare_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Prepare { .. }))
    }

    pub fn bind_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Bind { .. }))
    }

    pub fn begin_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Begin { .. }))
    }

    pub fn commit_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Commit { .. }))
    }

    pub fn rollback_count(&self) -> usize {
        self.count(|c| matches!(c, Call::Rollback { .. }))
    }
}

impl Executor for MockConnection {
    async fn execute(&self, sql: &str, params: &[Value]) -> DriverResult<RowsAffected> {
        self.state.execute(Call::Execute {
            sql: sql.into(),
            params: params.into(),
            statement: None,
            transaction: None,
        })
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> RowStream<'a> {
        self.state.query(Call::Query {
            sql: sql.into(),
            params: params.into(),
            statement: None,
            transaction: None,
        })
    }
}

impl Connection for MockConnection {
    type Prepared = MockPrepared;
    type Transaction = MockTransaction;

    async fn prepare(&self, sql: &str) -> DriverResult<MockPrepared> {
        let statement = self.state.next_statement();
        self.state.record(Call::Prepare {
            statement,
            sql: sql.into(),
        });
        self.state.check()?;
        Ok(MockPrepared {
            id: statement,
            sql: sql.into(),
            transaction: None,
            state: self.state.clone(),
        })
    }

    async fn begin(&self) -> DriverResult<MockTransaction> {
        let transaction = self.state.next_transaction();
        self.state.record(Call::Begin { transaction });
        self.state.check()?;
        Ok(MockTransaction {
            id: transaction,
            state: self.state.clone(),
        })
    }
}
