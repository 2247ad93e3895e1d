//! User command - register and inspect users

use std::env;

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Input, Password};

use passbook_core::services::LogEvent;

use super::{get_context, get_logger, log_event, resolve_user};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    New {
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Email address (must not be registered yet)
        #[arg(long)]
        email: Option<String>,
        /// Password (prompted with confirmation when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the profile behind a session token
    Show {
        /// Session token (defaults to PASSBOOK_TOKEN)
        #[arg(long, env = "PASSBOOK_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Get password from --password flag, PASSBOOK_PASSWORD env var, or prompt
fn get_password_with_confirm(password_flag: Option<String>) -> Result<String> {
    // 1. Check --password flag first
    if let Some(p) = password_flag {
        return Ok(p);
    }

    // 2. Check PASSBOOK_PASSWORD environment variable
    if let Ok(p) = env::var("PASSBOOK_PASSWORD") {
        return Ok(p);
    }

    // 3. Prompt interactively with confirmation
    let p1 = Password::new().with_prompt("Enter password").interact()?;
    let p2 = Password::new().with_prompt("Confirm password").interact()?;

    if p1 != p2 {
        anyhow::bail!("Passwords do not match");
    }
    Ok(p1)
}

pub async fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::New {
            name,
            email,
            password,
            json,
        } => run_new(name, email, password, json).await,
        UserCommands::Show { token, json } => run_show(token, json).await,
    }
}

async fn run_new(
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let name = match name {
        Some(n) => n,
        None => Input::new().with_prompt("Name").interact_text()?,
    };
    let email = match email {
        Some(e) => e,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = get_password_with_confirm(password)?;

    match ctx.user_service.create_user(&name, &email, &password).await {
        Ok(user) => {
            log_event(&logger, LogEvent::new("user_created").with_command("user new"));
            if json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                output::success("User created");
                println!("  ID: {}", user.id);
                println!("  Name: {}", user.name);
                println!("  Email: {}", user.email);
                println!();
                println!("Log in with: pb login --email {}", user.email);
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("user_create_failed")
                    .with_command("user new")
                    .with_error(e.kind()),
            );
            Err(e.into())
        }
    }
}

async fn run_show(token: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, token)?;
    let profile = ctx.user_service.get_profile(user_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    println!("{}", "User Profile".bold());
    println!("  ID: {}", profile.id);
    println!("  Name: {}", profile.name);
    println!("  Email: {}", profile.email);
    println!("  Member since: {}", profile.created_at.format("%Y-%m-%d"));

    Ok(())
}
