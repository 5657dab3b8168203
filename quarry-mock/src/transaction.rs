use crate::{Call, MockPrepared, state::MockState};
use quarry_core::{DriverResult, Executor, RowStream, RowsAffected, Transaction, Value};
use std::sync::Arc;

#[derive(Debug)]
pub struct MockTransaction {
    pub(crate) id: u64,
    pub(crate) state: Arc<MockState>,
}

impl MockTransaction {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Executor for MockTransaction {
    async fn execute(&self, sql: &str, params: &[Value]) -> DriverResult<RowsAffected> {
        self.state.execute(Call::Execute {
            sql: sql.into(),
            params: params.into(),
            statement: None,
            transaction: Some(self.id),
        })
    }

    fn query<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> RowStream<'a> {
        self.state.query(Call::Query {
            sql: sql.into(),
            params: params.into(),
            statement: None,
            transaction: Some(self.id),
        })
    }
}

impl Transaction for MockTransaction {
    type Prepared = MockPrepared;

    fn bind(&self, prepared: &MockPrepared) -> DriverResult<MockPrepared> {
        self.state.record(Call::Bind {
            statement: prepared.id,
            transaction: self.id,
        });
        Ok(MockPrepared {
            transaction: Some(self.id),
            ..prepared.clone()
        })
    }

    async fn commit(self) -> DriverResult<()> {
        self.state.record(Call::Commit {
            transaction: self.id,
        });
        self.state.check()
    }

    async fn rollback(self) -> DriverResult<()> {
        self.state.record(Call::Rollback {
            transaction: self.id,
        });
        self.state.check()
    }
}
