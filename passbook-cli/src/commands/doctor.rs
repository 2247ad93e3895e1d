//! Doctor command - run ledger health checks

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Color};
use serde_json::Value;

use super::get_context;
use crate::output;
use passbook_core::services::DoctorResult;

pub fn run(verbose: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.doctor_service.run_checks()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        render_report(&result, verbose);
    }

    // A failing check makes the whole invocation fail
    if result.summary.errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn render_report(result: &DoctorResult, verbose: bool) {
    println!("{}", "Ledger Health Check".bold());
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Check", "Status", "Message"]);

    for (check_name, check) in &result.checks {
        table.add_row(vec![
            Cell::new(check_name),
            status_cell(&check.status),
            Cell::new(&check.message),
        ]);

        if !verbose {
            continue;
        }
        for detail in check.details.iter().flatten() {
            table.add_row(vec![
                Cell::new(""),
                Cell::new(""),
                Cell::new(format!("  - {}", format_detail(detail))),
            ]);
        }
    }

    println!("{}", table);
    println!();
    println!(
        "Summary: {} passed, {} warnings, {} errors",
        result.summary.passed.to_string().green(),
        result.summary.warnings.to_string().yellow(),
        result.summary.errors.to_string().red(),
    );
}

fn status_cell(status: &str) -> Cell {
    match status {
        "pass" => Cell::new("PASS").fg(Color::Green),
        "warning" => Cell::new("WARN").fg(Color::Yellow),
        "error" => Cell::new("ERROR").fg(Color::Red),
        other => Cell::new(other),
    }
}

/// Render one detail value on a single table line
fn format_detail(value: &Value) -> String {
    let object = match value {
        Value::Object(map) => map,
        Value::String(s) => return s.clone(),
        other => return other.to_string(),
    };

    let mut parts = Vec::new();
    for (key, val) in object {
        if val.is_null() {
            continue;
        }
        let rendered = match val.as_str() {
            // Long strings get cut so one detail stays one line
            Some(s) if s.len() > 40 => format!("{}...", &s[..37]),
            Some(s) => s.to_string(),
            None => val.to_string(),
        };
        parts.push(format!("{}: {}", key, rendered));
    }
    parts.join(", ")
}
