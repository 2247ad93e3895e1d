//! Ledger-wide status summary

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;

/// Aggregates counts, totals, and bounds for the status command
pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn get_status(&self) -> Result<StatusSummary> {
        let (total_deposited, total_withdrawn) = self.repository.get_operation_totals()?;

        Ok(StatusSummary {
            total_users: self.repository.user_count()?,
            total_statements: self.repository.statement_count()?,
            // Money renders as strings; a JSON number would go through f64
            total_deposited: total_deposited.to_string(),
            total_withdrawn: total_withdrawn.to_string(),
            net_held: (total_deposited - total_withdrawn).to_string(),
            date_range: self.repository.get_statement_date_range()?,
            database_path: self.repository.db_path().display().to_string(),
            database_size_bytes: self.repository.get_db_size()?,
        })
    }
}

/// Snapshot of the whole ledger
#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_users: i64,
    pub total_statements: i64,
    pub total_deposited: String,
    pub total_withdrawn: String,
    /// Deposits minus withdrawals across every user
    pub net_held: String,
    pub date_range: DateRange,
    pub database_path: String,
    pub database_size_bytes: u64,
}

/// Earliest and latest statement timestamps, absent on an empty ledger
#[derive(Debug, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}
