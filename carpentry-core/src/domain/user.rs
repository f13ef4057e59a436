//! User identity

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity resolved from the bearer token
///
/// The server forwards the GitHub profile of the user, so only a handful of
/// fields are typed; the rest is kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl User {
    /// Best human-readable name available
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.login.as_deref())
            .unwrap_or("anonymous")
    }
}
