//! Doctor service - ledger health checks

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};

use crate::adapters::duckdb::DuckDbRepository;

/// Runs consistency checks over the whole ledger
pub struct DoctorService {
    repository: Arc<DuckDbRepository>,
}

impl DoctorService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Run all health checks
    pub fn run_checks(&self) -> Result<DoctorResult> {
        let mut checks = BTreeMap::new();
        checks.insert("orphaned_statements".to_string(), self.orphaned_statements()?);
        checks.insert("overdrawn_balances".to_string(), self.overdrawn_balances()?);
        checks.insert("timestamp_sanity".to_string(), self.timestamp_sanity()?);
        checks.insert("duplicate_emails".to_string(), self.duplicate_emails()?);
        checks.insert("pending_migrations".to_string(), self.pending_migrations()?);

        let summary = DoctorSummary::tally(checks.values());
        Ok(DoctorResult { checks, summary })
    }

    /// Every statement must belong to an existing user
    fn orphaned_statements(&self) -> Result<CheckResult> {
        let orphans = self.repository.check_orphaned_statements()?;
        if orphans.is_empty() {
            return Ok(CheckResult::pass("No orphaned statements found"));
        }

        let details = orphans
            .iter()
            .map(|row| match row.split_once(':') {
                Some((statement_id, user_id)) => {
                    json!({"statement_id": statement_id, "user_id": user_id})
                }
                None => json!({"statement_id": row}),
            })
            .collect();
        Ok(CheckResult::error(
            format!("{} statement(s) reference missing users", orphans.len()),
            details,
        ))
    }

    /// A negative derived balance means a withdrawal got past the funds
    /// check at some point
    fn overdrawn_balances(&self) -> Result<CheckResult> {
        let overdrawn = self.repository.check_overdrawn_users()?;
        if overdrawn.is_empty() {
            return Ok(CheckResult::pass("No user balance is negative"));
        }

        let details = overdrawn
            .iter()
            .map(|row| match row.split_once('|') {
                Some((user_id, balance)) => json!({"user_id": user_id, "balance": balance}),
                None => json!({"user_id": row}),
            })
            .collect();
        Ok(CheckResult::error(
            format!("{} user(s) have a negative balance", overdrawn.len()),
            details,
        ))
    }

    /// Statements stamped in the future or before 2000 point at clock bugs
    fn timestamp_sanity(&self) -> Result<CheckResult> {
        let suspect = self.repository.check_timestamp_sanity()?;
        if suspect.is_empty() {
            return Ok(CheckResult::pass("All statement timestamps are plausible"));
        }

        let details = suspect
            .iter()
            .map(|row| match row.split_once('|') {
                Some((statement_id, created_at)) => {
                    json!({"statement_id": statement_id, "created_at": created_at})
                }
                None => json!({"info": row}),
            })
            .collect();
        Ok(CheckResult::error(
            format!("{} statement(s) have unreasonable timestamps", suspect.len()),
            details,
        ))
    }

    /// The unique index should make duplicates impossible
    fn duplicate_emails(&self) -> Result<CheckResult> {
        let duplicates = self.repository.check_duplicate_emails()?;
        if duplicates.is_empty() {
            return Ok(CheckResult::pass("All emails are unique"));
        }

        let details = duplicates.iter().map(|email| json!({"email": email})).collect();
        Ok(CheckResult::error(
            format!("{} email(s) appear on more than one user", duplicates.len()),
            details,
        ))
    }

    fn pending_migrations(&self) -> Result<CheckResult> {
        let pending = self.repository.pending_migrations()?;
        if pending.is_empty() {
            return Ok(CheckResult::pass("Schema is up to date"));
        }

        let details = pending.iter().map(|name| json!({"migration": name})).collect();
        Ok(CheckResult::warning(
            format!("{} migration(s) have not been applied", pending.len()),
            details,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: BTreeMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Value>>,
}

impl CheckResult {
    fn pass(message: &str) -> Self {
        Self {
            status: "pass".to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    fn warning(message: String, details: Vec<Value>) -> Self {
        Self {
            status: "warning".to_string(),
            message,
            details: Some(details),
        }
    }

    fn error(message: String, details: Vec<Value>) -> Self {
        Self {
            status: "error".to_string(),
            message,
            details: Some(details),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}

impl DoctorSummary {
    fn tally<'a>(checks: impl Iterator<Item = &'a CheckResult>) -> Self {
        let mut summary = Self {
            passed: 0,
            warnings: 0,
            errors: 0,
        };
        for check in checks {
            match check.status.as_str() {
                "pass" => summary.passed += 1,
                "warning" => summary.warnings += 1,
                _ => summary.errors += 1,
            }
        }
        summary
    }
}
