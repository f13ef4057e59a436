//! Build-related API endpoints

use crate::CarpentryClient;
use crate::error::Result;
use carpentry_core::domain::build::Build;
use carpentry_core::dto::build::BuildOutput;
use uuid::Uuid;

impl CarpentryClient {
    /// Get a build's status and metadata
    pub async fn get_build(&self, build_id: Uuid) -> Result<Build> {
        self.get(&format!("/api/build/{}", build_id)).await
    }

    /// Get the current stdout snapshot of a build
    ///
    /// The server returns the whole output accumulated so far, not a delta.
    pub async fn get_build_output(&self, build_id: Uuid) -> Result<BuildOutput> {
        self.get(&format!("/api/build/{}/output", build_id)).await
    }

    /// Delete a single build
    pub async fn delete_build(&self, build_id: Uuid) -> Result<serde_json::Value> {
        self.delete(&format!("/api/build/{}", build_id)).await
    }
}
