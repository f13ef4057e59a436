//! Builder DTOs

use serde::{Deserialize, Serialize};

use crate::domain::preset::ScriptConfig;

/// Request to create a builder (`POST /api/builder`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBuilder {
    pub name: String,
    pub git_uri: String,
    pub shell_script: String,
    /// Ask the server to generate a deploy key pair for the repository
    pub generate_ssh_keys: bool,
}

impl CreateBuilder {
    pub fn new(name: impl Into<String>, git_uri: impl Into<String>, script: ScriptConfig) -> Self {
        Self {
            name: name.into(),
            git_uri: git_uri.into(),
            shell_script: script.script,
            generate_ssh_keys: true,
        }
    }
}

/// Partial update of a builder (`PUT /api/builder/:id`)
///
/// Fields left as `None` are not sent and keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditBuilder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell_script: Option<String>,
}

impl EditBuilder {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.git_uri.is_none() && self.shell_script.is_none()
    }
}
