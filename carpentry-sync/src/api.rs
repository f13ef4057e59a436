//! Backend seam
//!
//! The sync core talks to the server through this trait so pollers can be
//! driven by scripted backends in tests. `CarpentryClient` is the HTTP
//! implementation.

use async_trait::async_trait;
use carpentry_client::{CarpentryClient, ClientError};
use carpentry_core::domain::build::Build;
use carpentry_core::domain::builder::Builder;
use carpentry_core::domain::user::User;
use carpentry_core::dto::build::{BuildOutput, ClearedBuilds, TriggerBuild};
use carpentry_core::dto::builder::{CreateBuilder, EditBuilder};
use carpentry_core::dto::preferences::Preferences;
use uuid::Uuid;

/// Every server operation the sync core uses
#[async_trait]
pub trait CarpentryApi: Send + Sync {
    async fn list_builders(&self) -> Result<Vec<Builder>, ClientError>;

    async fn get_builder(&self, builder_id: Uuid) -> Result<Builder, ClientError>;

    async fn create_builder(&self, req: &CreateBuilder) -> Result<Builder, ClientError>;

    async fn edit_builder(&self, builder_id: Uuid, req: &EditBuilder)
    -> Result<Builder, ClientError>;

    async fn delete_builder(&self, builder_id: Uuid) -> Result<Builder, ClientError>;

    async fn trigger_build(&self, builder_id: Uuid, req: &TriggerBuild)
    -> Result<Build, ClientError>;

    async fn list_builds(&self, builder_id: Uuid) -> Result<Vec<Build>, ClientError>;

    async fn clear_builds(&self, builder_id: Uuid) -> Result<ClearedBuilds, ClientError>;

    async fn get_build(&self, build_id: Uuid) -> Result<Build, ClientError>;

    /// Current stdout snapshot of a build
    async fn fetch_output(&self, build_id: Uuid) -> Result<BuildOutput, ClientError>;

    async fn delete_build(&self, build_id: Uuid) -> Result<(), ClientError>;

    async fn current_user(&self) -> Result<User, ClientError>;

    async fn set_preferences(&self, req: &Preferences) -> Result<Preferences, ClientError>;
}

#[async_trait]
impl CarpentryApi for CarpentryClient {
    async fn list_builders(&self) -> Result<Vec<Builder>, ClientError> {
        CarpentryClient::list_builders(self).await
    }

    async fn get_builder(&self, builder_id: Uuid) -> Result<Builder, ClientError> {
        CarpentryClient::get_builder(self, builder_id).await
    }

    async fn create_builder(&self, req: &CreateBuilder) -> Result<Builder, ClientError> {
        CarpentryClient::create_builder(self, req).await
    }

    async fn edit_builder(
        &self,
        builder_id: Uuid,
        req: &EditBuilder,
    ) -> Result<Builder, ClientError> {
        CarpentryClient::edit_builder(self, builder_id, req).await
    }

    async fn delete_builder(&self, builder_id: Uuid) -> Result<Builder, ClientError> {
        CarpentryClient::delete_builder(self, builder_id).await
    }

    async fn trigger_build(
        &self,
        builder_id: Uuid,
        req: &TriggerBuild,
    ) -> Result<Build, ClientError> {
        CarpentryClient::trigger_build(self, builder_id, req).await
    }

    async fn list_builds(&self, builder_id: Uuid) -> Result<Vec<Build>, ClientError> {
        CarpentryClient::list_builds(self, builder_id).await
    }

    async fn clear_builds(&self, builder_id: Uuid) -> Result<ClearedBuilds, ClientError> {
        CarpentryClient::clear_builds(self, builder_id).await
    }

    async fn get_build(&self, build_id: Uuid) -> Result<Build, ClientError> {
        CarpentryClient::get_build(self, build_id).await
    }

    async fn fetch_output(&self, build_id: Uuid) -> Result<BuildOutput, ClientError> {
        self.get_build_output(build_id).await
    }

    async fn delete_build(&self, build_id: Uuid) -> Result<(), ClientError> {
        CarpentryClient::delete_build(self, build_id).await.map(|_| ())
    }

    async fn current_user(&self) -> Result<User, ClientError> {
        CarpentryClient::current_user(self).await
    }

    async fn set_preferences(&self, req: &Preferences) -> Result<Preferences, ClientError> {
        CarpentryClient::set_preferences(self, req).await
    }
}
