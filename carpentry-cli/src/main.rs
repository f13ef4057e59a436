//! Carpentry CLI
//!
//! Command-line client for a Carpentry CI server: manage builders, trigger
//! builds and follow their output live.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "carpentry")]
#[command(about = "Carpentry CI command-line client", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(long, env = "CARPENTRY_URL", default_value = "http://localhost:5000")]
    url: String,

    /// Bearer token issued by the server after login
    #[arg(long, env = "CARPENTRY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Build output poll interval in milliseconds
    #[arg(long, env = "CARPENTRY_BUILD_POLL_MS")]
    build_poll_ms: Option<u64>,

    /// Builder view poll interval in milliseconds
    #[arg(long, env = "CARPENTRY_BUILDER_POLL_MS")]
    builder_poll_ms: Option<u64>,

    /// Dashboard poll interval in milliseconds
    #[arg(long, env = "CARPENTRY_INDEX_POLL_MS")]
    index_poll_ms: Option<u64>,

    /// Maximum number of polls per session
    #[arg(long, env = "CARPENTRY_MAX_TICKS")]
    max_ticks: Option<u32>,

    /// View to redirect to when the server rejects the token
    #[arg(long, env = "CARPENTRY_LOGIN_ROUTE")]
    login_route: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries build output; logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carpentry_cli=info,carpentry_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        url: cli.url,
        token: cli.token,
        build_poll_ms: cli.build_poll_ms,
        builder_poll_ms: cli.builder_poll_ms,
        index_poll_ms: cli.index_poll_ms,
        max_ticks: cli.max_ticks,
        login_route: cli.login_route,
    };

    handle_command(cli.command, &config).await
}
