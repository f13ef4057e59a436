//! Configuration module
//!
//! Turns the global CLI flags into a sync configuration and a connected
//! sync context.

use anyhow::{Context, Result};
use carpentry_sync::{SyncConfig, SyncContext, SyncEvent};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// CLI configuration
///
/// Unset polling knobs keep the `SyncConfig` defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// URL of the Carpentry server
    pub url: String,

    /// Bearer token, if logged in
    pub token: Option<String>,

    /// Build output poll interval in milliseconds
    pub build_poll_ms: Option<u64>,

    /// Builder view poll interval in milliseconds
    pub builder_poll_ms: Option<u64>,

    /// Dashboard poll interval in milliseconds
    pub index_poll_ms: Option<u64>,

    /// Tick budget per polling session
    pub max_ticks: Option<u32>,

    /// View to redirect to when the server answers 401
    pub login_route: Option<String>,
}

impl Config {
    /// Sync settings for this invocation
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = SyncConfig::new(self.url.clone());
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            config = config.with_token(token);
        }
        if let Some(ms) = self.build_poll_ms {
            config.build_poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.builder_poll_ms {
            config.builder_poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.index_poll_ms {
            config.index_poll_interval = Duration::from_millis(ms);
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = max_ticks;
        }
        if let Some(route) = &self.login_route {
            config.login_route.clone_from(route);
        }
        config.validate()?;
        Ok(config)
    }

    /// Build a sync context talking to the configured server
    pub fn connect(&self) -> Result<(SyncContext, UnboundedReceiver<SyncEvent>)> {
        let config = self.sync_config()?;
        SyncContext::connect(&config)
            .with_context(|| format!("Failed to set up client for {}", config.base_url))
    }
}
