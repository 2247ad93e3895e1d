//! Use-case services.
//!
//! Each service owns one feature area. The ledger use cases reach
//! storage through the port traits; the maintenance services (status,
//! doctor, query) bind to the DuckDB adapter since they report on the
//! database file itself.

mod auth;
mod backup;
mod balance;
mod doctor;
pub mod logging;
pub mod migration;
mod password;
mod query;
mod statement;
mod status;
mod token;
mod user;

pub use auth::{AuthService, AuthSession};
pub use backup::{BackupMetadata, BackupService, ClearResult};
pub use balance::BalanceService;
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use password::PasswordService;
pub use query::QueryService;
pub use statement::StatementService;
pub use status::{DateRange, StatusService, StatusSummary};
pub use token::TokenService;
pub use user::UserService;
