//! Balance command - show the current derived balance

use anyhow::Result;
use colored::Colorize;

use super::{get_context, resolve_user};
use crate::output;

pub async fn run(include_statements: bool, token: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, token)?;

    let sheet = ctx
        .balance_service
        .get_balance(user_id, include_statements)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sheet)?);
        return Ok(());
    }

    println!("Balance: {}", sheet.balance.to_string().bold());

    if let Some(statements) = &sheet.statements {
        if statements.is_empty() {
            println!("No statements yet.");
            return Ok(());
        }

        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Operation", "Amount", "Description", "Created"]);

        for statement in statements {
            table.add_row(vec![
                statement.operation.as_str().to_string(),
                statement.amount.to_string(),
                statement.description.clone(),
                statement.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }

        println!("{}", table);
    }

    Ok(())
}
