//! Logs command - inspect and prune the activity log

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use colored::Colorize;
use clap::Subcommand;

use super::get_passbook_dir;
use crate::output;
use passbook_core::services::{EntryPoint, LogEntry, LoggingService};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let service = open_log_store()?;
    match command {
        LogsCommands::List {
            limit,
            errors,
            json,
        } => list(&service, limit, errors, json),
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => clear(&service, older_than_days, force, json),
        LogsCommands::Stats { json } => stats(&service, json),
    }
}

fn open_log_store() -> Result<LoggingService> {
    LoggingService::new(&get_passbook_dir(), EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn list(service: &LoggingService, limit: usize, errors_only: bool, json: bool) -> Result<()> {
    let entries = if errors_only {
        service.get_errors(limit)?
    } else {
        service.get_recent(limit)?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("No log entries found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Entry", "Event", "Command", "Error"]);
    for entry in &entries {
        table.add_row(entry_row(entry));
    }
    println!("{}", table);

    // A plain listing still surfaces the latest failures underneath
    if !errors_only {
        print_recent_errors(service)?;
    }
    Ok(())
}

fn entry_row(entry: &LogEntry) -> Vec<String> {
    let error_marker = match entry.error_message {
        Some(_) => "!".red().to_string(),
        None => String::new(),
    };
    vec![
        format_timestamp(entry.timestamp),
        entry.entry_point.clone(),
        entry.event.clone(),
        entry.command.clone().unwrap_or_default(),
        error_marker,
    ]
}

fn print_recent_errors(service: &LoggingService) -> Result<()> {
    let failures = service.get_errors(3)?;
    if failures.is_empty() {
        return Ok(());
    }

    println!();
    println!("{}", "Recent Errors:".red().bold());
    for failure in &failures {
        println!(
            "  {} [{}]: {}",
            format_timestamp(failure.timestamp).dimmed(),
            failure.event,
            failure.error_message.as_deref().unwrap_or("Unknown error")
        );
    }
    Ok(())
}

fn clear(service: &LoggingService, older_than_days: u64, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let prompt = format!("Delete logs older than {} days?", older_than_days);
        if !output::confirm(&prompt)? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let cutoff = Utc::now() - Duration::days(older_than_days as i64);
    let deleted = service.delete_before(cutoff.timestamp_millis())?;

    if json {
        println!("{}", serde_json::json!({"deleted": deleted}));
    } else {
        println!("Deleted {} log entries", deleted);
    }
    Ok(())
}

fn stats(service: &LoggingService, json: bool) -> Result<()> {
    let total = service.count()?;
    let errors = service.error_count()?;
    let db_path = service.db_path().to_path_buf();
    let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "total_entries": total,
                "error_count": errors,
                "database_path": db_path.to_string_lossy(),
                "database_size_bytes": size_bytes
            })
        );
        return Ok(());
    }

    println!("{}", "Log Statistics".bold());
    println!("  Total entries: {}", total);
    println!("  Errors: {}", errors);
    println!("  Database: {}", db_path.display());
    println!("  Size: {}", output::format_size(size_bytes));
    Ok(())
}

fn format_timestamp(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp_ms.to_string(),
    }
}
