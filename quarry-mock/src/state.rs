use anyhow::Error;
use async_stream::try_stream;
use futures::StreamExt;
use quarry_core::{DriverResult, RawRow, RowStream, RowsAffected, Value};
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

/// Driver call recorded by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Prepare {
        statement: u64,
        sql: String,
    },
    Bind {
        statement: u64,
        transaction: u64,
    },
    Execute {
        sql: String,
        params: Vec<Value>,
        statement: Option<u64>,
        transaction: Option<u64>,
    },
    Query {
        sql: String,
        params: Vec<Value>,
        statement: Option<u64>,
        transaction: Option<u64>,
    },
    Begin {
        transaction: u64,
    },
    Commit {
        transaction: u64,
    },
    Rollback {
        transaction: u64,
    },
}

impl Call {
    /// SQL text of prepare, execute and query calls.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Call::Prepare { sql, .. } | Call::Execute { sql, .. } | Call::Query { sql, .. } => {
                Some(sql)
            }
            _ => None,
        }
    }

    pub fn params(&self) -> Option<&[Value]> {
        match self {
            Call::Execute { params, .. } | Call::Query { params, .. } => Some(params),
            _ => None,
        }
    }
}

#[derive(Default, Debug)]
pub(crate) struct MockState {
    calls: Mutex<Vec<Call>>,
    rows: Mutex<VecDeque<Vec<RawRow>>>,
    affected: Mutex<VecDeque<RowsAffected>>,
    failures: Mutex<VecDeque<String>>,
    statements: AtomicU64,
    transactions: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockState {
    pub(crate) fn record(&self, call: Call) {
        log::trace!("{call:?}");
        lock(&self.calls).push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    pub(crate) fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    pub(crate) fn push_rows(&self, rows: Vec<RawRow>) {
        lock(&self.rows).push_back(rows);
    }

    pub(crate) fn push_affected(&self, affected: RowsAffected) {
        lock(&self.affected).push_back(affected);
    }

    pub(crate) fn push_failure(&self, message: String) {
        lock(&self.failures).push_back(message);
    }

    pub(crate) fn next_statement(&self) -> u64 {
        self.statements.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn next_transaction(&self) -> u64 {
        self.transactions.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Fails when a failure was scripted.
    pub(crate) fn check(&self) -> DriverResult<()> {
        match lock(&self.failures).pop_front() {
            Some(message) => {
                log::error!("{message}");
                Err(Error::msg(message))
            }
            None => Ok(()),
        }
    }

    pub(crate) fn execute(&self, call: Call) -> DriverResult<RowsAffected> {
        self.record(call);
        self.check()?;
        Ok(lock(&self.affected).pop_front().unwrap_or_default())
    }

    /// Replays the next scripted result set, an empty one when none is left.
    pub(crate) fn query(self: &Arc<Self>, call: Call) -> RowStream<'static> {
        self.record(call);
        let state = self.clone();
        try_stream! {
            state.check()?;
            let rows = lock(&state.rows).pop_front().unwrap_or_default();
            for row in rows {
                yield row;
            }
        }
        .boxed()
    }
}
