//! Identity endpoint

use crate::CarpentryClient;
use crate::error::Result;
use carpentry_core::domain::user::User;

impl CarpentryClient {
    /// Resolve the identity behind the bearer token
    pub async fn current_user(&self) -> Result<User> {
        self.get("/api/user").await
    }
}
