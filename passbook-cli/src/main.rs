//! Command-line entry point for pb.
//!
//! Argument parsing lives here; each subcommand's behavior lives under
//! `commands`.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{backup, balance, doctor, login, logs, query, statement, status, user};

/// Track deposits, withdrawals, and balances from your terminal
#[derive(Parser)]
#[command(name = "pb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Log in and print a session token
    Login {
        /// Account email
        #[arg(long)]
        email: Option<String>,
        /// Account password
        #[arg(long)]
        password: Option<String>,
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a deposit
    Deposit {
        /// Amount (e.g. 120.50)
        amount: String,
        /// What this deposit is
        description: String,
        /// Session token (defaults to PASSBOOK_TOKEN)
        #[arg(long, env = "PASSBOOK_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a withdrawal
    Withdraw {
        /// Amount (e.g. 45.00)
        amount: String,
        /// What this withdrawal is
        description: String,
        /// Session token (defaults to PASSBOOK_TOKEN)
        #[arg(long, env = "PASSBOOK_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the current balance
    Balance {
        /// Include the full statement list
        #[arg(long)]
        statements: bool,
        /// Session token (defaults to PASSBOOK_TOKEN)
        #[arg(long, env = "PASSBOOK_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect ledger statements
    Statement {
        #[command(subcommand)]
        command: statement::StatementCommands,
    },

    /// Show ledger status and summary
    Status {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Run ledger health checks
    Doctor {
        /// Print details for every check, not just failures
        #[arg(long, short)]
        verbose: bool,
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Execute a read-only SQL query against the ledger
    Query {
        /// SQL text to run (reads stdin when omitted)
        sql: Option<String>,
        /// Load the SQL from a file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Render as table, csv, or json
        #[arg(long, default_value = "table")]
        format: String,
        /// Shorthand for --format json
        #[arg(long)]
        json: bool,
    },

    /// Manage backups
    Backup {
        #[command(subcommand)]
        command: backup::BackupCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = run(Cli::parse()).await {
        output::error(&format!("{}", e));
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::User { command } => user::run(command).await,
        Commands::Login {
            email,
            password,
            json,
        } => login::run(email, password, json).await,
        Commands::Deposit {
            amount,
            description,
            token,
            json,
        } => statement::run_deposit(&amount, &description, token, json).await,
        Commands::Withdraw {
            amount,
            description,
            token,
            json,
        } => statement::run_withdraw(&amount, &description, token, json).await,
        Commands::Balance {
            statements,
            token,
            json,
        } => balance::run(statements, token, json).await,
        Commands::Statement { command } => statement::run(command).await,
        Commands::Status { json } => status::run(json),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Query {
            sql,
            file,
            format,
            json,
        } => query::run(
            sql.as_deref(),
            file.as_deref(),
            if json { "json" } else { format.as_str() },
        ),
        Commands::Backup { command } => backup::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
