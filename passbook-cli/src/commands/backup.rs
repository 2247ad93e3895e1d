//! Backup command - manage ledger backups

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{get_context, get_passbook_dir};
use crate::output;
use passbook_core::services::BackupService;

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        /// Maximum number of backups to keep
        #[arg(long, short = 'm')]
        max_backups: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List available backups
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore from a backup
    Restore {
        /// Backup name to restore
        name: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear all backups
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: BackupCommands) -> Result<()> {
    match command {
        BackupCommands::Create { max_backups, json } => create(max_backups, json),
        BackupCommands::List { json } => list(json),
        BackupCommands::Restore { name, force, json } => restore(&name, force, json),
        BackupCommands::Clear { force, json } => clear(force, json),
    }
}

/// Archive-only operations work straight off the data directory; only
/// create goes through the full context so the database file exists and
/// is in a consistent state.
fn archive_store() -> BackupService {
    BackupService::new(get_passbook_dir(), "passbook.duckdb".to_string())
}

fn create(max_backups: Option<usize>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.backup_service.create(max_backups)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", "Backup created".green());
        println!("  Name: {}", result.name);
        println!("  Size: {}", result.size_display());
    }
    Ok(())
}

fn list(json: bool) -> Result<()> {
    let backups = archive_store().list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&backups)?);
        return Ok(());
    }
    if backups.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Name", "Created", "Size"]);
    for backup in &backups {
        table.add_row(vec![
            backup.name.clone(),
            backup.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            backup.size_display(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn restore(name: &str, force: bool, json: bool) -> Result<()> {
    if !force && !json && !output::confirm(&format!("Restore from backup '{}'?", name))? {
        println!("Cancelled.");
        return Ok(());
    }

    archive_store().restore(name)?;

    if json {
        println!("{}", serde_json::json!({"restored": name}));
    } else {
        println!("Ledger restored from backup: {}", name);
    }
    Ok(())
}

fn clear(force: bool, json: bool) -> Result<()> {
    if !force && !json && !output::confirm("Delete all backups?")? {
        println!("Cancelled.");
        return Ok(());
    }

    let result = archive_store().clear()?;

    if json {
        println!("{}", serde_json::json!({"deleted": result.deleted}));
    } else {
        println!("Deleted {} backup(s)", result.deleted);
    }
    Ok(())
}
