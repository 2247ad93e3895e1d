//! Status command - show ledger totals and storage info

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let status = get_context()?.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let rows = [
        ("Users", status.total_users.to_string()),
        ("Statements", status.total_statements.to_string()),
        ("Total deposited", status.total_deposited.clone()),
        ("Total withdrawn", status.total_withdrawn.clone()),
        ("Net held", status.net_held.clone()),
    ];
    let mut table = output::create_table();
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value]);
    }
    println!("{}", table);
    println!();

    if let (Some(earliest), Some(latest)) = (&status.date_range.earliest, &status.date_range.latest)
    {
        println!("Activity range: {} to {}", earliest, latest);
        println!();
    }

    println!(
        "Database: {} ({})",
        status.database_path,
        output::format_size(status.database_size_bytes)
    );

    Ok(())
}
