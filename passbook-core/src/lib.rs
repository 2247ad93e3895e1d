//! Core business logic for the pb personal bookkeeping tool.
//!
//! The crate follows a hexagonal layout:
//!
//! - **domain**: entities and the shared error type (User, Statement, BalanceSheet)
//! - **ports**: repository traits the services depend on
//! - **services**: use cases orchestrating domain and ports
//! - **adapters**: DuckDB and in-memory implementations of the ports

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::{StatementRepository, UserRepository};
use services::*;

// Flat re-exports so embedders rarely need the full module paths
pub use adapters::duckdb::QueryResult;
pub use domain::result::Error;
pub use domain::{BalanceSheet, OperationType, Statement, User, UserProfile};

const DB_FILENAME: &str = "passbook.duckdb";

/// Owns the repository and every service the CLI needs.
///
/// Constructing one opens (and migrates) the ledger database under the
/// given data directory; commands borrow the services from here.
pub struct PassbookContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub user_service: UserService,
    pub auth_service: AuthService,
    pub statement_service: StatementService,
    pub balance_service: BalanceService,
    pub status_service: StatusService,
    pub query_service: QueryService,
    pub backup_service: BackupService,
    pub doctor_service: DoctorService,
}

impl PassbookContext {
    pub fn new(passbook_dir: &Path) -> Result<Self> {
        let config = Config::load(passbook_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&passbook_dir.join(DB_FILENAME))?);
        repository.ensure_schema()?;

        // Use-case services see the repository only through its ports
        let users: Arc<dyn UserRepository> = repository.clone();
        let statements: Arc<dyn StatementRepository> = repository.clone();

        let token_service = TokenService::new(passbook_dir, config.token_ttl_minutes)?;

        Ok(Self {
            user_service: UserService::new(users.clone()),
            auth_service: AuthService::new(users.clone(), token_service),
            statement_service: StatementService::new(users.clone(), statements.clone()),
            balance_service: BalanceService::new(users, statements),
            status_service: StatusService::new(Arc::clone(&repository)),
            query_service: QueryService::new(Arc::clone(&repository)),
            backup_service: BackupService::new(passbook_dir.to_path_buf(), DB_FILENAME.to_string()),
            doctor_service: DoctorService::new(Arc::clone(&repository)),
            config,
            repository,
        })
    }
}
