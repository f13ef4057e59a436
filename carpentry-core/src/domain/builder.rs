//! Builder domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A configured build job: a git repository plus the shell script to run
///
/// The `id` is assigned by the server when the builder is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Builder {
    pub id: Uuid,
    pub name: String,
    pub git_uri: String,
    pub shell_script: String,
    #[serde(default)]
    pub generate_ssh_keys: bool,
    /// Status of the most recent build, as reported by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_rsa_public: Option<String>,
}
