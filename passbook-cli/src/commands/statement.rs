//! Statement commands - record and inspect ledger operations

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;
use uuid::Uuid;

use passbook_core::services::LogEvent;
use passbook_core::{OperationType, Statement};

use super::{get_context, get_logger, log_event, resolve_user};
use crate::output;

#[derive(Subcommand)]
pub enum StatementCommands {
    /// List all statements in the ledger
    List {
        /// Session token (defaults to PASSBOOK_TOKEN)
        #[arg(long, env = "PASSBOOK_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single statement
    Show {
        /// Statement ID
        id: String,
        /// Session token (defaults to PASSBOOK_TOKEN)
        #[arg(long, env = "PASSBOOK_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: StatementCommands) -> Result<()> {
    match command {
        StatementCommands::List { token, json } => run_list(token, json).await,
        StatementCommands::Show { id, token, json } => run_show(&id, token, json).await,
    }
}

pub async fn run_deposit(
    amount: &str,
    description: &str,
    token: Option<String>,
    json: bool,
) -> Result<()> {
    create(OperationType::Deposit, amount, description, token, json).await
}

pub async fn run_withdraw(
    amount: &str,
    description: &str,
    token: Option<String>,
    json: bool,
) -> Result<()> {
    create(OperationType::Withdraw, amount, description, token, json).await
}

async fn create(
    operation: OperationType,
    amount: &str,
    description: &str,
    token: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let user_id = resolve_user(&ctx, token)?;

    let amount: Decimal = amount
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid amount: expected a number like 120.50"))?;

    match ctx
        .statement_service
        .create(user_id, operation, amount, description)
        .await
    {
        Ok(statement) => {
            log_event(
                &logger,
                LogEvent::new("statement_created").with_command(operation.as_str()),
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&statement)?);
            } else {
                match operation {
                    OperationType::Deposit => output::success("Deposit recorded"),
                    OperationType::Withdraw => output::success("Withdrawal recorded"),
                }
                print_statement(&statement);
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("statement_failed")
                    .with_command(operation.as_str())
                    .with_error(e.kind()),
            );
            Err(e.into())
        }
    }
}

async fn run_list(token: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, token)?;

    let sheet = ctx.balance_service.get_balance(user_id, true).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sheet)?);
        return Ok(());
    }

    let statements = sheet.statements.unwrap_or_default();
    if statements.is_empty() {
        println!("No statements yet. Record one with 'pb deposit'.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Operation", "Amount", "Description", "Created"]);

    for statement in &statements {
        table.add_row(vec![
            statement.id.to_string(),
            statement.operation.as_str().to_string(),
            statement.amount.to_string(),
            statement.description.clone(),
            statement.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{}", table);
    println!();
    println!("Balance: {}", sheet.balance.to_string().bold());

    Ok(())
}

async fn run_show(id: &str, token: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, token)?;

    let statement_id =
        Uuid::parse_str(id).map_err(|_| anyhow::anyhow!("Invalid statement id: {}", id))?;
    let statement = ctx
        .statement_service
        .get_operation(user_id, statement_id)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statement)?);
        return Ok(());
    }

    println!("{}", "Statement".bold());
    print_statement(&statement);

    Ok(())
}

fn print_statement(statement: &Statement) {
    println!("  ID: {}", statement.id);
    println!("  Operation: {}", statement.operation.as_str());
    println!("  Amount: {}", statement.amount);
    println!("  Description: {}", statement.description);
    println!(
        "  Created: {}",
        statement.created_at.format("%Y-%m-%d %H:%M:%S")
    );
}
