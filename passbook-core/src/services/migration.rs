//! Migration service - applies the embedded schema migrations
//!
//! Applied names are recorded in sys_migrations, so running the service
//! twice is a no-op. The 000 bootstrap file only creates that bookkeeping
//! table and is safe to execute unconditionally.

use std::collections::HashSet;

use anyhow::Result;
use duckdb::Connection;

use crate::migrations::MIGRATIONS;

/// What one run changed
#[derive(Debug)]
pub struct MigrationResult {
    /// Migrations this run executed, in application order
    pub applied: Vec<String>,
    /// How many were already recorded before the run
    pub already_applied: usize,
}

pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Apply every migration not yet recorded in sys_migrations, in order
    pub fn run_pending(&self) -> Result<MigrationResult> {
        self.ensure_bookkeeping()?;

        let applied = self.applied_names()?;
        let mut newly_applied = Vec::new();

        for (name, sql) in MIGRATIONS {
            if applied.contains(*name) {
                continue;
            }
            self.conn.execute_batch(sql)?;
            self.mark_applied(name)?;
            newly_applied.push(name.to_string());
        }

        Ok(MigrationResult {
            already_applied: applied.len(),
            applied: newly_applied,
        })
    }

    /// Names of migrations not yet applied
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = self.applied_names()?;
        Ok(MIGRATIONS
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| !applied.contains(*name))
            .map(String::from)
            .collect())
    }

    /// Create the sys_migrations table if this is a fresh database
    fn ensure_bookkeeping(&self) -> Result<()> {
        if let Some((_, sql)) = MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql") {
            self.conn.execute_batch(sql)?;
        }
        Ok(())
    }

    fn applied_names(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<duckdb::Result<HashSet<String>>>()?;
        Ok(names)
    }

    fn mark_applied(&self, name: &str) -> Result<()> {
        self.conn
            .execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckdb::Connection;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = ?",
            [name],
            |row| row.get(0),
        )
        .unwrap_or(false)
    }

    #[test]
    fn test_fresh_database_applies_everything_once() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let first = service.run_pending().unwrap();
        assert_eq!(first.applied.len(), MIGRATIONS.len());
        assert_eq!(first.already_applied, 0);

        // Everything is recorded now, so a rerun is a no-op
        let second = service.run_pending().unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.already_applied, MIGRATIONS.len());
    }

    #[test]
    fn test_initial_schema_creates_ledger_tables() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);
        service.run_pending().unwrap();

        assert!(table_exists(&conn, "sys_users"));
        assert!(table_exists(&conn, "sys_statements"));

        // The statement sequence must exist so inserts get ordered
        conn.execute(
            "INSERT INTO sys_statements (statement_id, user_id, operation, amount,
                                         description, created_at, updated_at)
             VALUES ('s1', 'u1', 'deposit', '10.00', 'first', '2026-01-01T00:00:00+00:00',
                     '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        let seq: i64 = conn
            .query_row(
                "SELECT seq FROM sys_statements WHERE statement_id = 's1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(seq >= 1);
    }

    #[test]
    fn test_pending_lists_unapplied_names() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        // Bookkeeping table exists but nothing is recorded yet
        conn.execute_batch(MIGRATIONS[0].1).unwrap();
        assert_eq!(service.get_pending().unwrap().len(), MIGRATIONS.len());

        service.run_pending().unwrap();
        assert!(service.get_pending().unwrap().is_empty());
    }

    #[test]
    fn test_schema_rejects_unknown_operation() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn).run_pending().unwrap();

        let result = conn.execute(
            "INSERT INTO sys_statements (statement_id, user_id, operation, amount,
                                         description, created_at, updated_at)
             VALUES ('s1', 'u1', 'transfer', '10.00', 'bad', '2026-01-01T00:00:00+00:00',
                     '2026-01-01T00:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_schema_enforces_unique_email() {
        let conn = Connection::open_in_memory().unwrap();
        MigrationService::new(&conn).run_pending().unwrap();

        let insert = "INSERT INTO sys_users (user_id, name, email, password_hash,
                                             created_at, updated_at)
                      VALUES (?, 'A', 'dup@example.com', 'h', '2026-01-01T00:00:00+00:00',
                              '2026-01-01T00:00:00+00:00')";
        conn.execute(insert, ["u1"]).unwrap();
        assert!(conn.execute(insert, ["u2"]).is_err());
    }
}
