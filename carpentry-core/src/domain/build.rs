//! Build domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::build::BuildOutput;

/// One execution of a builder
///
/// `stdout` grows while the build runs. Once the status is terminal and the
/// server reports `done`, the record no longer changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: Uuid,
    pub builder_id: Uuid,
    pub status: BuildStatus,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    /// Exit code of the build script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_finished: Option<DateTime<Utc>>,
}

impl Build {
    /// Builds a minimal record from an output snapshot
    ///
    /// Used when output arrives for a build that has no cached metadata yet.
    /// Without a status in the snapshot the build is taken to be running.
    pub fn from_output(builder_id: Uuid, build_id: Uuid, output: &BuildOutput) -> Self {
        Self {
            id: build_id,
            builder_id,
            status: output.status.unwrap_or(BuildStatus::Running),
            stdout: output.stdout.clone(),
            done: output.done,
            commit: None,
            author_name: None,
            author_email: None,
            code: None,
            date_created: None,
            date_finished: None,
        }
    }

    /// Overlays an output snapshot, keeping the remaining metadata
    pub fn apply_output(&mut self, output: &BuildOutput) {
        if let Some(status) = output.status {
            self.status = status;
        }
        self.stdout.clone_from(&output.stdout);
        self.done = output.done;
    }

    /// Returns true once the record can no longer change
    pub fn is_final(&self) -> bool {
        self.done && self.status.is_terminal()
    }
}

/// Build lifecycle status
///
/// `retrieving`, `checking` and `preparing` are intermediate steps the worker
/// reports between `scheduled` and `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Ready,
    Scheduled,
    Retrieving,
    Checking,
    Preparing,
    Running,
    Succeeded,
    Failed,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BuildStatus::Succeeded | BuildStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Ready => "ready",
            BuildStatus::Scheduled => "scheduled",
            BuildStatus::Retrieving => "retrieving",
            BuildStatus::Checking => "checking",
            BuildStatus::Preparing => "preparing",
            BuildStatus::Running => "running",
            BuildStatus::Succeeded => "succeeded",
            BuildStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
