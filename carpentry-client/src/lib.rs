//! Carpentry HTTP Client
//!
//! A type-safe HTTP client for the Carpentry CI API.
//!
//! Every call returns a single `Result<T, ClientError>`; the error keeps the
//! endpoint and HTTP status so callers can decide how loudly to report it.
//!
//! # Example
//!
//! ```no_run
//! use carpentry_client::CarpentryClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CarpentryClient::with_token("http://localhost:5000", "secret")?;
//!
//!     for builder in client.list_builders().await? {
//!         println!("{} -> {}", builder.name, builder.git_uri);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
mod builders;
mod builds;
mod preferences;
mod users;

pub use error::{ClientError, Result};

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

/// HTTP client for the Carpentry API
///
/// Endpoints are grouped as:
/// - Builder management (list, create, get, edit, delete, trigger)
/// - Build access (list, clear, get, output, delete)
/// - Identity (current user)
/// - Server-wide preferences
#[derive(Debug, Clone)]
pub struct CarpentryClient {
    /// Base URL of the server (e.g., "http://localhost:5000")
    base_url: String,
    /// HTTP client instance, carrying the default auth header
    client: Client,
}

impl CarpentryClient {
    /// Create a client without credentials
    ///
    /// # Example
    /// ```
    /// use carpentry_client::CarpentryClient;
    ///
    /// let client = CarpentryClient::new("http://localhost:5000");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client that sends `Authorization: Bearer <token>` on every request
    ///
    /// The header is set once here, for the whole session.
    pub fn with_token(base_url: impl Into<String>, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ClientError::InvalidRequest(format!("invalid token: {}", e)))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a client around a preconfigured reqwest `Client`
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =============================================================================
    // Request Helpers
    // =============================================================================

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| ClientError::unreachable(path, e))?;

        self.handle_response(path, response).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .map_err(|e| ClientError::unreachable(path, e))?;

        self.handle_response(path, response).await
    }

    async fn send_json<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::unreachable(path, e))?;

        self.handle_response(path, response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// Non-2xx responses become `ClientError::ApiError` carrying the body so
    /// the caller can pick up the optional `error` field.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        debug!("{} -> {}", path, status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(status.as_u16(), path, error_text));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::ParseError {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CarpentryClient::new("http://localhost:5000");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = CarpentryClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/api/builders"), "http://localhost:5000/api/builders");
    }

    #[test]
    fn test_client_with_token() {
        let client = CarpentryClient::with_token("http://localhost:5000", "abc-123").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_client_rejects_token_with_newline() {
        let err = CarpentryClient::with_token("http://localhost:5000", "abc\n123").unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
    }
}
