//! Read-only SQL access to the ledger database

use std::sync::Arc;

use anyhow::Result;

use crate::adapters::duckdb::{DuckDbRepository, QueryResult};

/// Hands ad-hoc SELECT statements to the repository, which enforces
/// that nothing in them can write
pub struct QueryService {
    repository: Arc<DuckDbRepository>,
}

impl QueryService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        Ok(self.repository.execute_query(sql)?)
    }
}
