//! Login command - exchange credentials for a session token

use std::env;

use anyhow::Result;
use dialoguer::{Input, Password};

use passbook_core::services::LogEvent;

use super::{get_context, get_logger, log_event};
use crate::output;

/// Get password from --password flag, PASSBOOK_PASSWORD env var, or prompt
fn get_password_or_prompt(password_flag: Option<String>) -> Result<String> {
    if let Some(p) = password_flag {
        return Ok(p);
    }

    if let Ok(p) = env::var("PASSBOOK_PASSWORD") {
        return Ok(p);
    }

    let p = Password::new().with_prompt("Password").interact()?;
    Ok(p)
}

pub async fn run(email: Option<String>, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let email = match email {
        Some(e) => e,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = get_password_or_prompt(password)?;

    match ctx.auth_service.authenticate(&email, &password).await {
        Ok(session) => {
            log_event(&logger, LogEvent::new("login").with_command("login"));
            if json {
                println!("{}", serde_json::to_string_pretty(&session)?);
            } else {
                output::success(&format!("Logged in as {}", session.user.name));
                println!();
                println!("Session token (valid for {} minutes):", ctx.config.token_ttl_minutes);
                println!("{}", session.token);
                println!();
                println!("export PASSBOOK_TOKEN={}", session.token);
            }
            Ok(())
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("login_failed")
                    .with_command("login")
                    .with_error(e.kind()),
            );
            Err(e.into())
        }
    }
}
