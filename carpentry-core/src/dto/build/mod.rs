//! Build DTOs

use serde::{Deserialize, Serialize};

use crate::domain::build::BuildStatus;

/// Current output snapshot of a build (`GET /api/build/:id/output`)
///
/// Only `stdout` and `done` are guaranteed; `status` is overlaid on the
/// cached build when the server sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BuildStatus>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub done: bool,
}

/// Optional authorship attached when triggering a build
///
/// Missing fields are filled in by the server from the authenticated user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerBuild {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

/// Response of `DELETE /api/builder/:id/builds`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClearedBuilds {
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_output_without_status() {
        let output: BuildOutput = serde_json::from_str(r#"{"stdout":"line1","done":true}"#).unwrap();
        assert_eq!(output.status, None);
        assert_eq!(output.stdout, "line1");
        assert!(output.done);
    }

    #[test]
    fn test_decode_output_with_status() {
        let output: BuildOutput =
            serde_json::from_str(r#"{"status":"failed","stdout":"boom","done":true}"#).unwrap();
        assert_eq!(output.status, Some(BuildStatus::Failed));
    }
}
