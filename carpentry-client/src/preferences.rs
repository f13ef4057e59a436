//! Preferences endpoint

use crate::CarpentryClient;
use crate::error::Result;
use carpentry_core::dto::preferences::Preferences;
use reqwest::Method;

impl CarpentryClient {
    /// Store server-wide preferences
    ///
    /// # Returns
    /// The preferences the server stored; empty fields are skipped
    pub async fn set_preferences(&self, req: &Preferences) -> Result<Preferences> {
        self.send_json(Method::POST, "/api/preferences", req).await
    }
}
