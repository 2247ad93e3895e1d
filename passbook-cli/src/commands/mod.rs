//! CLI command implementations

pub mod backup;
pub mod balance;
pub mod doctor;
pub mod login;
pub mod logs;
pub mod query;
pub mod statement;
pub mod status;
pub mod user;

use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

use passbook_core::services::{EntryPoint, LogEvent, LoggingService};
use passbook_core::PassbookContext;

/// Data directory: $PASSBOOK_DIR when set, otherwise ~/.passbook
pub fn get_passbook_dir() -> PathBuf {
    match std::env::var("PASSBOOK_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::home_dir()
            .expect("Could not find home directory")
            .join(".passbook"),
    }
}

/// Open the activity log. None when it cannot be initialized; commands
/// run fine without a log.
pub fn get_logger() -> Option<LoggingService> {
    let passbook_dir = get_passbook_dir();
    std::fs::create_dir_all(&passbook_dir).ok()?;
    LoggingService::new(&passbook_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Best-effort write to the activity log
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(log) = logger {
        let _ = log.log(event);
    }
}

/// Build the full context, creating the data directory on first use
pub fn get_context() -> Result<PassbookContext> {
    let passbook_dir = get_passbook_dir();
    std::fs::create_dir_all(&passbook_dir)
        .with_context(|| format!("Failed to create passbook directory: {:?}", passbook_dir))?;
    PassbookContext::new(&passbook_dir).context("Failed to initialize passbook context")
}

/// Resolve the calling user from a session token
///
/// The token comes from the --token flag or the PASSBOOK_TOKEN environment
/// variable (clap resolves the env var before this runs).
pub fn resolve_user(ctx: &PassbookContext, token: Option<String>) -> Result<Uuid> {
    let token = token
        .ok_or_else(|| anyhow::anyhow!("Not logged in. Run 'pb login' and export PASSBOOK_TOKEN."))?;
    Ok(ctx.auth_service.verify(token.trim())?)
}
