//! DuckDB-backed persistence for users and the statement ledger.
//!
//! A single [`DuckDbRepository`] owns the connection behind a mutex, so
//! every operation observes a serial history of the database file.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use sqlparser::dialect::DuckDbDialect;
use sqlparser::parser::Parser;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{OperationType, Statement, User};
use crate::ports::{StatementRepository, UserRepository};
use crate::services::{DateRange, MigrationResult, MigrationService};

/// Attempts made while the database file is locked by another process
const MAX_RETRIES: u32 = 5;

/// Backoff starts here and doubles per attempt: 50, 100, 200, 400ms
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Lock-contention messages differ per platform; match the known phrasings.
fn is_retryable_error(err_msg: &str) -> bool {
    const BUSY_MARKERS: [&str; 5] = [
        "being used by another process",
        "cannot access the file",
        "resource temporarily unavailable",
        "database is locked",
        "file is already open",
    ];
    let lower = err_msg.to_lowercase();
    BUSY_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Check if an error message reports a unique-index violation
fn is_unique_violation(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("duplicate key") || lower.contains("unique constraint")
}

/// Parse the SQL up front so malformed input fails with a readable
/// message instead of a database engine error.
fn validate_sql_syntax(sql: &str) -> Result<()> {
    match Parser::parse_sql(&DuckDbDialect {}, sql) {
        Ok(_) => Ok(()),
        Err(e) => {
            // The parser prefixes every message with its own tag
            let msg = e.to_string();
            Err(Error::validation(msg.trim_start_matches("sql parser error: ")))
        }
    }
}

/// Reject any statement that could write.
///
/// The query must lead with SELECT or WITH, and no write keyword may
/// appear anywhere inside it, subqueries included. Keywords only count
/// when preceded by a separator, so column names like created_at never
/// trip the check.
fn ensure_read_only(sql: &str) -> Result<()> {
    const WRITE_KEYWORDS: [&str; 7] = [
        "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
    ];

    let lead_word = sql
        .split_whitespace()
        .next()
        .map(str::to_uppercase)
        .unwrap_or_default();
    if lead_word != "SELECT" && lead_word != "WITH" {
        return Err(Error::validation("Only SELECT queries are allowed"));
    }

    let upper = sql.to_uppercase();
    for keyword in WRITE_KEYWORDS {
        for separator in [' ', '\n', '('] {
            if upper.contains(&format!("{}{} ", separator, keyword)) {
                return Err(Error::validation("Only SELECT queries are allowed"));
            }
        }
    }

    Ok(())
}

/// DuckDB repository backing the user and statement stores
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open the ledger database.
    ///
    /// Two pb invocations racing at startup contend for the file lock, so
    /// opening retries with exponential backoff before giving up.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) if attempt + 1 < MAX_RETRIES && is_retryable_error(&e.to_string()) => {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS << attempt);
                    eprintln!(
                        "[passbook] Database busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off: the JSON extension is statically
        // linked through a crate feature, and stale cached extensions under
        // ~/.duckdb can fail code signature checks on macOS.
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Apply any migrations this database file has not seen yet
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn.lock().unwrap();
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(e.to_string()))
    }

    /// Schema bootstrap for fresh files; a no-op once everything is applied
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations().map(|_| ())
    }

    /// Names of migrations not yet applied (surfaced by doctor)
    pub fn pending_migrations(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        MigrationService::new(&conn)
            .get_pending()
            .map_err(|e| Error::database(e.to_string()))
    }

    // === User operations ===

    pub fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO sys_users (user_id, name, email, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.password_hash,
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            // The unique index on email is the authoritative duplicate check
            Err(e) if is_unique_violation(&e.to_string()) => Err(Error::EmailAlreadyInUse),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, name, email, password_hash, created_at, updated_at
             FROM sys_users WHERE email = ?",
        )?;

        let user = stmt
            .query_row([email], |row| Ok(self.row_to_user(row)))
            .ok();

        Ok(user)
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, name, email, password_hash, created_at, updated_at
             FROM sys_users WHERE user_id = ?",
        )?;

        let user = stmt
            .query_row([id.to_string()], |row| Ok(self.row_to_user(row)))
            .ok();

        Ok(user)
    }

    pub fn user_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sys_users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_user(&self, row: &duckdb::Row) -> User {
        // Column indices from SELECT:
        // 0: user_id, 1: name, 2: email, 3: password_hash, 4: created_at, 5: updated_at
        let id_str: String = row.get(0).unwrap_or_default();
        let created_str: String = row.get(4).unwrap_or_default();
        let updated_str: String = row.get(5).unwrap_or_default();

        User {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            name: row.get(1).unwrap_or_default(),
            email: row.get(2).unwrap_or_default(),
            password_hash: row.get(3).unwrap_or_default(),
            created_at: parse_timestamp(&created_str),
            updated_at: parse_timestamp(&updated_str),
        }
    }

    // === Statement operations ===

    pub fn create_statement(&self, statement: &Statement) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        // Amounts bind as strings so DuckDB casts straight to DECIMAL
        // without a float round trip
        conn.execute(
            "INSERT INTO sys_statements (statement_id, user_id, operation, amount,
                                         description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                statement.id.to_string(),
                statement.user_id.to_string(),
                statement.operation.as_str(),
                statement.amount.to_string(),
                statement.description,
                statement.created_at.to_rfc3339(),
                statement.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Append a withdrawal only if the user's balance covers it.
    ///
    /// The funds check and the insert are a single SQL statement executed
    /// while holding the connection mutex, so two racing withdrawals can
    /// never both observe the same pre-withdrawal balance.
    pub fn create_withdrawal_if_funded(&self, statement: &Statement) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let rows_changed = conn.execute(
            "INSERT INTO sys_statements (statement_id, user_id, operation, amount,
                                         description, created_at, updated_at)
             SELECT ?, ?, ?, ?, ?, ?, ?
             WHERE (SELECT COALESCE(SUM(CASE WHEN operation = 'deposit'
                                             THEN amount ELSE -amount END), 0)
                    FROM sys_statements
                    WHERE user_id = ?) >= CAST(? AS DECIMAL(18, 2))",
            params![
                statement.id.to_string(),
                statement.user_id.to_string(),
                statement.operation.as_str(),
                statement.amount.to_string(),
                statement.description,
                statement.created_at.to_rfc3339(),
                statement.updated_at.to_rfc3339(),
                statement.user_id.to_string(),
                statement.amount.to_string(),
            ],
        )?;
        Ok(rows_changed > 0)
    }

    pub fn get_statement(&self, user_id: Uuid, statement_id: Uuid) -> Result<Option<Statement>> {
        let conn = self.conn.lock().unwrap();
        // Scoped to the owner: an id belonging to another user yields no row
        let mut stmt = conn.prepare(
            "SELECT statement_id, user_id, operation, amount::VARCHAR,
                    description, created_at, updated_at
             FROM sys_statements
             WHERE user_id = ? AND statement_id = ?",
        )?;

        let statement = stmt
            .query_row(
                params![user_id.to_string(), statement_id.to_string()],
                |row| Ok(self.row_to_statement(row)),
            )
            .ok();

        Ok(statement)
    }

    pub fn get_statements(&self, user_id: Uuid) -> Result<Vec<Statement>> {
        let conn = self.conn.lock().unwrap();
        // seq is fed by a sequence at insert time, so this is insertion order
        // even when created_at ties within a millisecond
        let mut stmt = conn.prepare(
            "SELECT statement_id, user_id, operation, amount::VARCHAR,
                    description, created_at, updated_at
             FROM sys_statements
             WHERE user_id = ?
             ORDER BY seq",
        )?;

        let rows = stmt.query_map([user_id.to_string()], |row| Ok(self.row_to_statement(row)))?;
        Ok(rows.flatten().collect())
    }

    pub fn get_balance(&self, user_id: Uuid) -> Result<Decimal> {
        let conn = self.conn.lock().unwrap();
        // Cast the DECIMAL sum to VARCHAR so it can be read back with full precision
        let balance_str: String = conn.query_row(
            "SELECT COALESCE(SUM(CASE WHEN operation = 'deposit'
                                      THEN amount ELSE -amount END), 0)::VARCHAR
             FROM sys_statements
             WHERE user_id = ?",
            [user_id.to_string()],
            |row| row.get(0),
        )?;

        balance_str
            .parse::<Decimal>()
            .map_err(|e| Error::database(format!("unreadable balance value: {}", e)))
    }

    pub fn statement_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_statements", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Totals per operation over the whole ledger: (deposits, withdrawals)
    pub fn get_operation_totals(&self) -> Result<(Decimal, Decimal)> {
        let conn = self.conn.lock().unwrap();
        let (deposits_str, withdrawals_str): (String, String) = conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN operation = 'deposit' THEN amount END), 0)::VARCHAR,
                COALESCE(SUM(CASE WHEN operation = 'withdraw' THEN amount END), 0)::VARCHAR
             FROM sys_statements",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let deposits = deposits_str.parse::<Decimal>().unwrap_or_default();
        let withdrawals = withdrawals_str.parse::<Decimal>().unwrap_or_default();
        Ok((deposits, withdrawals))
    }

    pub fn get_statement_date_range(&self) -> Result<DateRange> {
        let conn = self.conn.lock().unwrap();
        let (earliest, latest) = conn.query_row(
            "SELECT MIN(created_at)::VARCHAR, MAX(created_at)::VARCHAR
             FROM sys_statements",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(DateRange { earliest, latest })
    }

    fn row_to_statement(&self, row: &duckdb::Row) -> Statement {
        // Column indices from SELECT:
        // 0: statement_id, 1: user_id, 2: operation, 3: amount, 4: description,
        // 5: created_at, 6: updated_at
        let id_str: String = row.get(0).unwrap_or_default();
        let user_id_str: String = row.get(1).unwrap_or_default();
        let operation_str: String = row.get(2).unwrap_or_default();
        let amount_str: String = row.get(3).unwrap_or_default();
        let created_str: String = row.get(5).unwrap_or_default();
        let updated_str: String = row.get(6).unwrap_or_default();

        Statement {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            user_id: Uuid::parse_str(&user_id_str).unwrap_or_else(|_| Uuid::new_v4()),
            // The schema CHECK constraint restricts the column to these values
            operation: OperationType::parse(&operation_str).unwrap_or(OperationType::Deposit),
            amount: amount_str.parse::<Decimal>().unwrap_or_default(),
            description: row.get(4).unwrap_or_default(),
            created_at: parse_timestamp(&created_str),
            updated_at: parse_timestamp(&updated_str),
        }
    }

    // === Health check queries (used by DoctorService) ===

    /// One string per row from a single-column diagnostic query
    fn collect_strings(&self, sql: &str, params: &[&dyn duckdb::ToSql]) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get(0))?;
        Ok(rows.flatten().collect())
    }

    /// Statements whose user no longer exists, as "statement_id:user_id"
    pub fn check_orphaned_statements(&self) -> Result<Vec<String>> {
        self.collect_strings(
            "SELECT s.statement_id || ':' || s.user_id
             FROM sys_statements s
             LEFT JOIN sys_users u ON s.user_id = u.user_id
             WHERE u.user_id IS NULL",
            &[],
        )
    }

    /// Users whose derived balance is negative, as "user_id|balance"
    pub fn check_overdrawn_users(&self) -> Result<Vec<String>> {
        self.collect_strings(
            "SELECT user_id || '|' || balance::VARCHAR FROM (
                SELECT user_id,
                       SUM(CASE WHEN operation = 'deposit'
                                THEN amount ELSE -amount END) AS balance
                FROM sys_statements
                GROUP BY user_id
             ) WHERE balance < 0",
            &[],
        )
    }

    /// Statements stamped in the future or before the epoch of this system,
    /// as "statement_id|created_at"
    pub fn check_timestamp_sanity(&self) -> Result<Vec<String>> {
        // Timestamps are rfc3339 VARCHAR with a fixed +00:00 offset, so
        // string comparison orders the same way the instants do
        let one_day_future = (Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        self.collect_strings(
            "SELECT statement_id || '|' || created_at
             FROM sys_statements
             WHERE created_at > ? OR created_at < '2000-01-01'
             LIMIT 100",
            &[&one_day_future],
        )
    }

    /// Emails appearing on more than one user record
    pub fn check_duplicate_emails(&self) -> Result<Vec<String>> {
        self.collect_strings(
            "SELECT email FROM sys_users GROUP BY email HAVING COUNT(*) > 1",
            &[],
        )
    }

    // === Ad-hoc queries ===

    /// Run a caller-supplied read-only query against the ledger
    pub fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        ensure_read_only(sql)?;
        validate_sql_syntax(sql)?;

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let mut raw = stmt.query([])?;

        let mut rows: Vec<Vec<Value>> = Vec::new();
        while let Some(row) = raw.next()? {
            let width = row.as_ref().column_count();
            rows.push((0..width).map(|i| column_to_json(row, i)).collect());
        }
        // raw borrows stmt; end the borrow before asking stmt for names
        drop(raw);

        let columns: Vec<String> = (0..stmt.column_count())
            .map(|i| {
                stmt.column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect();

        Ok(QueryResult {
            row_count: rows.len(),
            columns,
            rows,
        })
    }

    // === Maintenance ===

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn get_db_size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.db_path)?.len())
    }
}

/// Convert one result cell to JSON.
///
/// DECIMAL and 128-bit integers surface as strings so amounts stay exact;
/// types with no JSON shape degrade to null rather than failing the query.
fn column_to_json(row: &duckdb::Row, idx: usize) -> Value {
    use duckdb::types::ValueRef;

    let cell = match row.get_ref(idx) {
        Ok(cell) => cell,
        Err(_) => return Value::Null,
    };

    match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => json!(i),
        ValueRef::SmallInt(i) => json!(i),
        ValueRef::Int(i) => json!(i),
        ValueRef::BigInt(i) => json!(i),
        ValueRef::UTinyInt(i) => json!(i),
        ValueRef::USmallInt(i) => json!(i),
        ValueRef::UInt(i) => json!(i),
        ValueRef::UBigInt(i) => json!(i),
        ValueRef::Float(f) => json!(f),
        ValueRef::Double(f) => json!(f),
        ValueRef::HugeInt(i) => json!(i.to_string()),
        ValueRef::Decimal(d) => json!(d.to_string()),
        ValueRef::Text(bytes) => json!(String::from_utf8_lossy(bytes)),
        ValueRef::Blob(bytes) => json!(format!("<blob {} bytes>", bytes.len())),
        ValueRef::Date32(days) => {
            // DATE arrives as days since 1970-01-01
            let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            json!((epoch + chrono::Duration::days(days as i64)).to_string())
        }
        ValueRef::Timestamp(_, micros) => {
            // TIMESTAMP arrives as microseconds since the epoch
            let rendered = chrono::DateTime::from_timestamp_micros(micros)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| micros.to_string());
            json!(rendered)
        }
        ValueRef::Time64(_, t) => json!(t),
        _ => Value::Null,
    }
}

#[async_trait]
impl UserRepository for DuckDbRepository {
    async fn create_user(&self, user: &User) -> Result<()> {
        DuckDbRepository::create_user(self, user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        DuckDbRepository::get_user_by_email(self, email)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        DuckDbRepository::get_user_by_id(self, id)
    }

    async fn user_count(&self) -> Result<i64> {
        DuckDbRepository::user_count(self)
    }
}

#[async_trait]
impl StatementRepository for DuckDbRepository {
    async fn create_statement(&self, statement: &Statement) -> Result<()> {
        DuckDbRepository::create_statement(self, statement)
    }

    async fn create_withdrawal_if_funded(&self, statement: &Statement) -> Result<bool> {
        DuckDbRepository::create_withdrawal_if_funded(self, statement)
    }

    async fn get_statement(
        &self,
        user_id: Uuid,
        statement_id: Uuid,
    ) -> Result<Option<Statement>> {
        DuckDbRepository::get_statement(self, user_id, statement_id)
    }

    async fn get_statements(&self, user_id: Uuid) -> Result<Vec<Statement>> {
        DuckDbRepository::get_statements(self, user_id)
    }

    async fn get_balance(&self, user_id: Uuid) -> Result<Decimal> {
        DuckDbRepository::get_balance(self, user_id)
    }

    async fn statement_count(&self) -> Result<i64> {
        DuckDbRepository::statement_count(self)
    }
}

/// Result set from an ad-hoc read-only query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

/// Timestamps persist as rfc3339 text; unreadable values fall back to
/// now instead of poisoning the whole row.
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => Utc::now(),
    }
}
