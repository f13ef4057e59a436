//! ID resolver module
//!
//! Resolves id prefixes typed on the command line to full ids by listing the
//! matching resources on the server.

use anyhow::{Context, Result, anyhow};
use carpentry_sync::SyncContext;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a builder id or prefix to a full id
///
/// A full id is returned as is, without asking the server.
///
/// # Errors
/// Fails if no builder or more than one builder matches, or if listing
/// builders fails.
pub async fn resolve_builder_id(context: &SyncContext, id: &IdOrPrefix) -> Result<Uuid> {
    if let Some(uuid) = id.as_uuid() {
        return Ok(uuid);
    }

    let builders = context
        .list_builders()
        .await
        .context("Failed to fetch builders for ID resolution")?;

    unique_match("builder", id, builders.iter().map(|b| b.id))
}

/// Resolve a build id or prefix among the builds of one builder
pub async fn resolve_build_id_in_builder(
    context: &SyncContext,
    builder_id: Uuid,
    id: &IdOrPrefix,
) -> Result<Uuid> {
    if let Some(uuid) = id.as_uuid() {
        return Ok(uuid);
    }

    let builds = context
        .list_builds(builder_id)
        .await
        .context("Failed to fetch builds for ID resolution")?;

    unique_match(
        &format!("build of builder {}", builder_id),
        id,
        builds.iter().map(|b| b.id),
    )
}

fn unique_match(kind: &str, id: &IdOrPrefix, candidates: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    let matches: Vec<Uuid> = candidates.filter(|candidate| id.matches(*candidate)).collect();

    match matches.as_slice() {
        [] => Err(anyhow!("No {} found with ID starting with '{}'", kind, id)),
        [only] => Ok(*only),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple {}s: {}",
                id,
                kind,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<Uuid> {
        [
            "ab120000-0000-4000-8000-000000000000",
            "ab340000-0000-4000-8000-000000000000",
            "cd560000-0000-4000-8000-000000000000",
        ]
        .iter()
        .map(|s| Uuid::parse_str(s).unwrap())
        .collect()
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let id: IdOrPrefix = "ab3".parse().unwrap();
        let resolved = unique_match("builder", &id, ids().into_iter()).unwrap();
        assert_eq!(resolved, ids()[1]);
    }

    #[test]
    fn test_ambiguous_prefix_fails() {
        let id: IdOrPrefix = "ab".parse().unwrap();
        let err = unique_match("builder", &id, ids().into_iter()).unwrap_err();
        assert!(err.to_string().contains("Ambiguous prefix 'ab'"));
    }

    #[test]
    fn test_unknown_prefix_fails() {
        let id: IdOrPrefix = "ff".parse().unwrap();
        let err = unique_match("builder", &id, ids().into_iter()).unwrap_err();
        assert!(err.to_string().starts_with("No builder found"));
    }
}
