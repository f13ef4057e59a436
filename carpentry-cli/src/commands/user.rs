//! User command handler

use anyhow::Result;
use colored::*;

use crate::config::Config;

/// Resolve and print the identity behind the configured token
pub async fn show_user(config: &Config) -> Result<()> {
    let (context, _events) = config.connect()?;
    let user = context.current_user().await?;

    println!("{}", "Logged in as:".bold());
    println!("  Name:  {}", user.display_name().cyan());
    if let Some(login) = &user.login {
        println!("  Login: {}", login);
    }
    if let Some(email) = &user.email {
        println!("  Email: {}", email.dimmed());
    }

    Ok(())
}
