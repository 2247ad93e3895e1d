//! Query command - run read-only SQL against the ledger database

use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use super::get_context;
use crate::output;
use passbook_core::QueryResult;

pub fn run(sql: Option<&str>, file: Option<&Path>, format: &str) -> Result<()> {
    let sql_content = read_sql(sql, file)?;

    let ctx = get_context()?;
    let result = ctx.query_service.execute(&sql_content)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "csv" => print_csv(&result),
        _ => print_table(&result),
    }
    Ok(())
}

/// SQL comes from the positional argument, a file, or piped stdin
fn read_sql(sql: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(sql) = sql {
        return Ok(sql.to_string());
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL file: {:?}", path));
    }
    if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read SQL from stdin")?;
        return Ok(buffer);
    }
    anyhow::bail!("No SQL query provided. Use positional argument, --file, or pipe from stdin.")
}

fn print_table(result: &QueryResult) {
    let mut table = output::create_table();
    table.set_header(&result.columns);
    for row in &result.rows {
        table.add_row(row.iter().map(render_cell));
    }

    println!("{}", table);
    println!();
    println!("{} row(s) returned", result.row_count);
}

fn print_csv(result: &QueryResult) {
    println!("{}", result.columns.join(","));
    for row in &result.rows {
        let fields: Vec<String> = row.iter().map(csv_field).collect();
        println!("{}", fields.join(","));
    }
}

fn render_cell(v: &Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_field(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        // Fields holding a delimiter, quote, or newline get quoted
        Value::String(s) if s.contains([',', '"', '\n']) => {
            format!("\"{}\"", s.replace('"', "\"\""))
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
