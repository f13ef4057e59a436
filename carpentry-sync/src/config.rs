//! Sync configuration
//!
//! Connection settings plus the polling intervals and tick budget shared by
//! every poller the sync context starts.

use std::time::Duration;

/// Default number of ticks a single polling session may run
pub const DEFAULT_MAX_TICKS: u32 = 720;

/// Sync configuration
///
/// Intervals and the tick budget apply to every session started from one
/// `SyncContext`; there is no per-view override.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Server base URL (e.g., "http://localhost:5000")
    pub base_url: String,

    /// Bearer token sent on every request
    pub token: Option<String>,

    /// How often an open build view polls its output
    pub build_poll_interval: Duration,

    /// How often an open builder view re-lists its builds
    pub builder_poll_interval: Duration,

    /// How often the dashboard re-lists builders
    pub index_poll_interval: Duration,

    /// Upper bound on ticks per polling session
    pub max_ticks: u32,

    /// View to redirect to when the server answers 401
    pub login_route: String,
}

impl SyncConfig {
    /// Creates a new configuration with defaults
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            token: None,
            build_poll_interval: Duration::from_millis(500),
            builder_poll_interval: Duration::from_millis(1000),
            index_poll_interval: Duration::from_millis(1000),
            max_ticks: DEFAULT_MAX_TICKS,
            login_route: "/splash".to_string(),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - CARPENTRY_URL (required)
    /// - CARPENTRY_TOKEN (optional)
    /// - CARPENTRY_BUILD_POLL_MS (optional, default: 500)
    /// - CARPENTRY_BUILDER_POLL_MS (optional, default: 1000)
    /// - CARPENTRY_INDEX_POLL_MS (optional, default: 1000)
    /// - CARPENTRY_MAX_TICKS (optional, default: 720)
    /// - CARPENTRY_LOGIN_ROUTE (optional, default: /splash)
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("CARPENTRY_URL")
            .map_err(|_| anyhow::anyhow!("CARPENTRY_URL environment variable not set"))?;

        let mut config = Self::new(base_url);
        config.token = std::env::var("CARPENTRY_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        if let Some(ms) = env_millis("CARPENTRY_BUILD_POLL_MS") {
            config.build_poll_interval = ms;
        }
        if let Some(ms) = env_millis("CARPENTRY_BUILDER_POLL_MS") {
            config.builder_poll_interval = ms;
        }
        if let Some(ms) = env_millis("CARPENTRY_INDEX_POLL_MS") {
            config.index_poll_interval = ms;
        }

        config.max_ticks = std::env::var("CARPENTRY_MAX_TICKS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TICKS);

        if let Ok(route) = std::env::var("CARPENTRY_LOGIN_ROUTE") {
            config.login_route = route;
        }

        Ok(config)
    }

    /// Sets the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Longest wall-clock time any one build view keeps polling
    pub fn build_session_ceiling(&self) -> Duration {
        self.build_poll_interval * self.max_ticks
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("base_url cannot be empty");
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("base_url must start with http:// or https://");
        }

        for (name, interval) in [
            ("build_poll_interval", self.build_poll_interval),
            ("builder_poll_interval", self.builder_poll_interval),
            ("index_poll_interval", self.index_poll_interval),
        ] {
            if interval.is_zero() {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        if self.max_ticks == 0 {
            anyhow::bail!("max_ticks must be greater than 0");
        }

        if !self.login_route.starts_with('/') {
            anyhow::bail!("login_route must be an absolute view path");
        }

        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000".to_string())
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
