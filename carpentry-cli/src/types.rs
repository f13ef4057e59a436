//! Common types used across CLI modules

use std::str::FromStr;
use uuid::Uuid;

/// Identifier given on the command line: a full UUID or a unique prefix of one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdOrPrefix {
    Full(Uuid),
    /// Lowercased prefix of the hyphenated form
    Prefix(String),
}

impl IdOrPrefix {
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            IdOrPrefix::Full(uuid) => Some(*uuid),
            IdOrPrefix::Prefix(_) => None,
        }
    }

    /// Whether `id` is the identified id (or starts with the prefix)
    pub fn matches(&self, id: Uuid) -> bool {
        match self {
            IdOrPrefix::Full(uuid) => *uuid == id,
            IdOrPrefix::Prefix(prefix) => id.to_string().starts_with(prefix.as_str()),
        }
    }
}

impl FromStr for IdOrPrefix {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if let Ok(uuid) = Uuid::parse_str(input) {
            return Ok(IdOrPrefix::Full(uuid));
        }

        let prefix = input.trim().to_lowercase();
        if prefix.is_empty() {
            return Err("id cannot be empty".to_string());
        }
        if !prefix.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
            return Err(format!("'{}' is not an id or id prefix", input));
        }
        Ok(IdOrPrefix::Prefix(prefix))
    }
}

impl std::fmt::Display for IdOrPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdOrPrefix::Full(uuid) => write!(f, "{}", uuid),
            IdOrPrefix::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}
