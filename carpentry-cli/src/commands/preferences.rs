//! Preferences command handler

use anyhow::{Context, Result, bail};
use carpentry_core::dto::preferences::Preferences;
use clap::Args;
use colored::*;

use crate::config::Config;

/// Server-wide preferences to store
#[derive(Args)]
pub struct PreferencesArgs {
    /// Path to the global deploy private key
    #[arg(long)]
    private_key: Option<String>,

    /// Path to the global deploy public key
    #[arg(long)]
    public_key: Option<String>,

    /// Registry that builds push images to
    #[arg(long)]
    docker_registry_url: Option<String>,
}

impl PreferencesArgs {
    fn into_request(self) -> Result<Preferences> {
        Ok(Preferences {
            global_id_rsa_private_key: self.private_key.as_deref().map(read_key).transpose()?,
            global_id_rsa_public_key: self.public_key.as_deref().map(read_key).transpose()?,
            docker_registry_url: self.docker_registry_url,
        })
    }
}

fn read_key(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read key file: {}", path))
}

/// Store the given preferences on the server
pub async fn set_preferences(args: PreferencesArgs, config: &Config) -> Result<()> {
    let req = args.into_request()?;
    if req.is_empty() {
        bail!("Nothing to save: pass --private-key, --public-key or --docker-registry-url");
    }

    let (context, _events) = config.connect()?;
    let stored = context.set_preferences(&req).await?;

    println!("{}", "✓ Preferences saved!".green().bold());
    if stored.global_id_rsa_private_key.is_some() {
        println!("  Private key:     {}", "updated".dimmed());
    }
    if let Some(key) = &stored.global_id_rsa_public_key {
        println!("  Public key:      {}", key.trim_end().dimmed());
    }
    if let Some(url) = &stored.docker_registry_url {
        println!("  Docker registry: {}", url.cyan());
    }

    Ok(())
}
