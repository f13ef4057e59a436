//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod build;
mod builder;
mod preferences;
mod user;
mod watch;

pub use build::BuildCommands;
pub use builder::BuilderCommands;
pub use preferences::PreferencesArgs;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Builder management
    Builder {
        #[command(subcommand)]
        command: BuilderCommands,
    },
    /// Build inspection and live output
    Build {
        #[command(subcommand)]
        command: BuildCommands,
    },
    /// Show the user the token belongs to
    User,
    /// Save server-wide preferences
    Preferences(PreferencesArgs),
}

/// Route a command to its handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Builder { command } => builder::handle_builder_command(command, config).await,
        Commands::Build { command } => build::handle_build_command(command, config).await,
        Commands::User => user::show_user(config).await,
        Commands::Preferences(args) => preferences::set_preferences(args, config).await,
    }
}
