use crate::Result;
use std::{collections::HashMap, future::Future};
use tokio::sync::RwLock;

/// Process wide map from SQL text to a prepared statement handle.
///
/// Reads are concurrent, a miss takes the write lock and checks again before
/// preparing, so each distinct SQL text is prepared at most once.
#[derive(Debug)]
pub struct PreparedCache<P> {
    statements: RwLock<HashMap<String, P>>,
}

impl<P: Clone> PreparedCache<P> {
    pub fn new() -> Self {
        Self {
            statements: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, sql: &str) -> Option<P> {
        self.statements.read().await.get(sql).cloned()
    }

    /// Returns the handle cached for `sql`, preparing it with `factory` on a miss.
    ///
    /// The write lock is held while `factory` runs: concurrent callers asking for
    /// the same text wait for it instead of preparing again. A failed preparation
    /// is not cached.
    pub async fn get_or_insert<F, Fut>(&self, sql: &str, factory: F) -> Result<P>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P>>,
    {
        if let Some(prepared) = self.statements.read().await.get(sql) {
            return Ok(prepared.clone());
        }
        let mut statements = self.statements.write().await;
        if let Some(prepared) = statements.get(sql) {
            return Ok(prepared.clone());
        }
        let prepared = factory().await?;
        statements.insert(sql.to_owned(), prepared.clone());
        Ok(prepared)
    }

    pub async fn len(&self) -> usize {
        self.statements.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.statements.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.statements.write().await.clear();
    }
}

impl<P: Clone> Default for PreparedCache<P> {
    fn default() -> Self {
        Self::new()
    }
}
