//! Server-wide preferences (`POST /api/preferences`)

use serde::{Deserialize, Serialize};

/// Global settings shared by every builder
///
/// The server skips unset and empty fields, and echoes back only the
/// preferences it stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Deploy key used for builders that do not generate their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_id_rsa_private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_id_rsa_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_registry_url: Option<String>,
}

impl Preferences {
    /// True when no field carries a value the server would store
    pub fn is_empty(&self) -> bool {
        [
            &self.global_id_rsa_private_key,
            &self.global_id_rsa_public_key,
            &self.docker_registry_url,
        ]
        .into_iter()
        .all(|field| field.as_deref().is_none_or(str::is_empty))
    }
}
