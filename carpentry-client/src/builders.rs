//! Builder-related API endpoints

use crate::CarpentryClient;
use crate::error::Result;
use carpentry_core::domain::build::Build;
use carpentry_core::domain::builder::Builder;
use carpentry_core::dto::build::{ClearedBuilds, TriggerBuild};
use carpentry_core::dto::builder::{CreateBuilder, EditBuilder};
use reqwest::Method;
use uuid::Uuid;

impl CarpentryClient {
    // =============================================================================
    // Builder Management
    // =============================================================================

    /// List all builders
    pub async fn list_builders(&self) -> Result<Vec<Builder>> {
        self.get("/api/builders").await
    }

    /// Create a new builder
    ///
    /// # Example
    /// ```no_run
    /// # use carpentry_client::CarpentryClient;
    /// # use carpentry_core::domain::preset::{BuilderPreset, ScriptConfig};
    /// # use carpentry_core::dto::builder::CreateBuilder;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = CarpentryClient::new("http://localhost:5000");
    /// let builder = client.create_builder(&CreateBuilder::new(
    ///     "lettuce",
    ///     "git@github.com:gabrielfalcao/lettuce.git",
    ///     ScriptConfig::from_preset(BuilderPreset::Python),
    /// )).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_builder(&self, req: &CreateBuilder) -> Result<Builder> {
        self.send_json(Method::POST, "/api/builder", req).await
    }

    /// Get a builder by ID
    pub async fn get_builder(&self, builder_id: Uuid) -> Result<Builder> {
        self.get(&format!("/api/builder/{}", builder_id)).await
    }

    /// Edit a builder; unset fields keep their value
    pub async fn edit_builder(&self, builder_id: Uuid, req: &EditBuilder) -> Result<Builder> {
        self.send_json(Method::PUT, &format!("/api/builder/{}", builder_id), req)
            .await
    }

    /// Delete a builder along with its builds
    ///
    /// # Returns
    /// The builder as it was before deletion
    pub async fn delete_builder(&self, builder_id: Uuid) -> Result<Builder> {
        self.delete(&format!("/api/builder/{}", builder_id)).await
    }

    // =============================================================================
    // Builder Builds
    // =============================================================================

    /// Trigger a new build of a builder
    pub async fn trigger_build(&self, builder_id: Uuid, req: &TriggerBuild) -> Result<Build> {
        self.send_json(
            Method::POST,
            &format!("/api/builder/{}/build", builder_id),
            req,
        )
        .await
    }

    /// List the builds of a builder
    pub async fn list_builds(&self, builder_id: Uuid) -> Result<Vec<Build>> {
        self.get(&format!("/api/builder/{}/builds", builder_id))
            .await
    }

    /// Delete every build of a builder
    ///
    /// # Returns
    /// How many builds were deleted
    pub async fn clear_builds(&self, builder_id: Uuid) -> Result<ClearedBuilds> {
        self.delete(&format!("/api/builder/{}/builds", builder_id))
            .await
    }
}
