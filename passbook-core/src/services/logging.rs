//! Logging service - structured event log in its own logs.duckdb
//!
//! Privacy rule: rows carry event names, command names, and error kinds.
//! Emails, names, amounts, descriptions, passwords, and tokens must never
//! reach this database.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::UNIX_EPOCH;

use anyhow::{anyhow, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;

const SELECT_COLUMNS: &str = "id, timestamp, entry_point, app_version, platform, \
     event, command, error_message, error_details";

/// Ids pack a millisecond timestamp above a per-process counter, so two
/// events in the same millisecond still get distinct ids.
const COUNTER_BITS: u64 = 16;
const COUNTER_MASK: u64 = (1 << COUNTER_BITS) - 1;

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_id() -> u64 {
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;
    (now_ms() as u64) << COUNTER_BITS | n
}

/// Current unix timestamp in milliseconds
fn now_ms() -> i64 {
    UNIX_EPOCH.elapsed().unwrap().as_millis() as i64
}

/// Which binary produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Service,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Service => "service",
        }
    }
}

/// One event to record, built up with the `with_*` methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl LogEvent {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            command: None,
            error_message: None,
            error_details: None,
        }
    }

    /// Attach the CLI command name
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attach an error kind (a stable variant name, not Display output)
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Attach extra error context, subject to the same privacy rule
    pub fn with_error_details(mut self, details: impl Into<String>) -> Self {
        self.error_details = Some(details.into());
        self
    }
}

/// A stored log row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub command: Option<String>,
    pub error_message: Option<String>,
    pub error_details: Option<String>,
}

/// Event log over logs.duckdb
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
}

impl LoggingService {
    /// Open (or create) logs.duckdb in the passbook directory and bring
    /// its schema up to date.
    pub fn new(
        passbook_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
    ) -> Result<Self> {
        let db_path = passbook_dir.join("logs.duckdb");
        let conn = Connection::open(&db_path)?;
        apply_log_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    /// Record one event, stamping entry point, version, and platform
    pub fn log(&self, event: LogEvent) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO sys_logs (id, timestamp, entry_point, app_version, platform, \
             event, command, error_message, error_details) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                std::env::consts::OS,
                &event.event,
                &event.command,
                &event.error_message,
                &event.error_details,
            ],
        )?;

        Ok(())
    }

    /// Record a bare event name
    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(LogEvent::new(event))
    }

    /// Record a failure event
    pub fn log_error(&self, event: &str, message: &str, details: Option<&str>) -> Result<()> {
        let mut entry = LogEvent::new(event).with_error(message);
        if let Some(extra) = details {
            entry = entry.with_error_details(extra);
        }
        self.log(entry)
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.fetch(None, limit)
    }

    /// Most recent entries that carry an error, newest first
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.fetch(Some("error_message IS NOT NULL"), limit)
    }

    fn fetch(&self, filter: Option<&str>, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM sys_logs", SELECT_COLUMNS);
        if let Some(predicate) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }
        sql.push_str(" ORDER BY timestamp DESC LIMIT ?");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([limit as i64], entry_from_row)?;
        Ok(rows.flatten().collect())
    }

    /// Total number of entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?)
    }

    /// Number of entries that carry an error
    pub fn error_count(&self) -> Result<u64> {
        let conn = self.conn()?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM sys_logs WHERE error_message IS NOT NULL",
            [],
            |row| row.get(0),
        )?)
    }

    /// Delete entries older than the given unix-ms timestamp, returning
    /// how many were removed.
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn entry_from_row(row: &duckdb::Row) -> duckdb::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        command: row.get(6)?,
        error_message: row.get(7)?,
        error_details: row.get(8)?,
    })
}

/// The log database keeps its own sys_migrations, separate from the main
/// database's, so the two schemas evolve independently.
fn apply_log_migrations(conn: &Connection) -> Result<()> {
    let bootstrapped: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !bootstrapped {
        if let Some((name, sql)) = LOG_MIGRATIONS
            .iter()
            .find(|(n, _)| *n == "000_migrations.sql")
        {
            conn.execute_batch(sql)?;
            conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
        }
    }

    let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
    let applied: std::collections::HashSet<String> =
        stmt.query_map([], |row| row.get(0))?.flatten().collect();

    for (name, sql) in LOG_MIGRATIONS {
        if *name == "000_migrations.sql" || applied.contains(*name) {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn service_in(dir: &TempDir) -> LoggingService {
        LoggingService::new(dir.path(), EntryPoint::Cli, "1.0.0").unwrap()
    }

    #[test]
    fn test_creates_log_database() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);

        assert!(service.db_path().exists());
        // Reopening must tolerate already-applied migrations
        drop(service);
        service_in(&dir);
    }

    #[test]
    fn test_log_event_round_trip() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);

        service.log_event("user_created").unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, "user_created");
        assert_eq!(entries[0].entry_point, "cli");
        assert_eq!(entries[0].app_version, "1.0.0");
        assert!(entries[0].command.is_none());
    }

    #[test]
    fn test_command_context_is_stored() {
        let dir = tempdir().unwrap();
        let service = LoggingService::new(dir.path(), EntryPoint::Service, "2.0.0").unwrap();

        service
            .log(LogEvent::new("statement_created").with_command("deposit"))
            .unwrap();

        let entries = service.get_recent(10).unwrap();
        assert_eq!(entries[0].command.as_deref(), Some("deposit"));
        assert_eq!(entries[0].entry_point, "service");
    }

    #[test]
    fn test_errors_are_queryable_separately() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);

        service.log_event("login").unwrap();
        service
            .log_error("statement_failed", "insufficient_funds", Some("withdraw"))
            .unwrap();

        let errors = service.get_errors(10).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].event, "statement_failed");
        assert_eq!(errors[0].error_message.as_deref(), Some("insufficient_funds"));
        assert_eq!(errors[0].error_details.as_deref(), Some("withdraw"));

        assert_eq!(service.count().unwrap(), 2);
        assert_eq!(service.error_count().unwrap(), 1);
    }

    #[test]
    fn test_delete_before_cutoff() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);

        service.log_event("login").unwrap();
        service.log_event("statement_created").unwrap();

        // A cutoff in the past removes nothing
        assert_eq!(service.delete_before(0).unwrap(), 0);
        assert_eq!(service.count().unwrap(), 2);

        // A cutoff in the future removes everything
        let deleted = service.delete_before(now_ms() + 1_000).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn test_ids_are_unique_within_a_burst() {
        let ids: Vec<u64> = (0..64).map(|_| generate_id()).collect();
        let unique: std::collections::HashSet<&u64> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
