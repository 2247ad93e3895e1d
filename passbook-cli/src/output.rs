//! Terminal output helpers shared by the pb commands

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use dialoguer::Confirm;

/// Green confirmation line on stdout
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Interactive yes/no prompt; answers no when the user just hits enter
pub fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}

/// Red failure line on stderr
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Table with the house preset; callers add headers and rows
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Render a byte count as a human-readable size
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["GB", "MB", "KB"];
    let mut scale = 1024u64.pow(3);
    for unit in UNITS {
        if bytes >= scale {
            return format!("{:.1} {}", bytes as f64 / scale as f64, unit);
        }
        scale /= 1024;
    }
    format!("{} bytes", bytes)
}
