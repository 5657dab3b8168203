use crate::{Call, state::MockState};
use quarry_core::{DriverResult, Prepared, RowStream, RowsAffected, Value};
use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// Statement prepared by [`crate::MockConnection`], bound to a transaction or not.
#[derive(Debug, Clone)]
pub struct MockPrepared {
    pub(crate) id: u64,
    pub(crate) sql: Arc<str>,
    pub(crate) transaction: Option<u64>,
    pub(crate) state: Arc<MockState>,
}

impl MockPrepared {
    /// Identifier of the prepare call, shared by every handle bound from it.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn transaction(&self) -> Option<u64> {
        self.transaction
    }
}

impl Prepared for MockPrepared {
    async fn execute(&self, params: &[Value]) -> DriverResult<RowsAffected> {
        self.state.execute(Call::Execute {
            sql: self.sql.to_string(),
            params: params.into(),
            statement: Some(self.id),
            transaction: self.transaction,
        })
    }

    fn query<'a>(&'a self, params: &'a [Value]) -> RowStream<'a> {
        self.state.query(Call::Query {
            sql: self.sql.to_string(),
            params: params.into(),
            statement: Some(self.id),
            transaction: self.transaction,
        })
    }
}

impl Display for MockPrepared {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MockPrepared#{}", self.id)?;
        if let Some(transaction) = self.transaction {
            write!(f, "@{transaction}")?;
        }
        Ok(())
    }
}
