//! Error types for the Carpentry client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Carpentry client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never reached the server (connection refused, DNS, timeout)
    #[error("{endpoint} unreachable: {message}")]
    Unreachable {
        /// Path of the endpoint that was called
        endpoint: String,
        /// Transport-level description of the failure
        message: String,
    },

    /// HTTP request failed after the connection was established
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error on {endpoint} (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Path of the endpoint that was called
        endpoint: String,
        /// Response body, usually `{"error": "..."}`
        message: String,
    },

    /// A successful response carried a body that could not be decoded
    #[error("Failed to parse response from {endpoint}: {message}")]
    ParseError { endpoint: String, message: String },

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code, endpoint and body
    pub fn api_error(status: u16, endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a transport error for a request that got no response
    pub fn unreachable(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Unreachable {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status of the response, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::RequestFailed(err) => err.status().map(|s| s.as_u16()),
            Self::Unreachable { .. } | Self::ParseError { .. } | Self::InvalidRequest(_) => None,
        }
    }

    /// Endpoint path the failure belongs to, when known
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Unreachable { endpoint, .. }
            | Self::ApiError { endpoint, .. }
            | Self::ParseError { endpoint, .. } => Some(endpoint),
            Self::RequestFailed(_) | Self::InvalidRequest(_) => None,
        }
    }

    /// Response body of an API error
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::ApiError { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(status) if (400..500).contains(&status))
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_exposes_status_and_endpoint() {
        let err = ClientError::api_error(404, "/api/build/1", r#"{"error":"no such build"}"#);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.endpoint(), Some("/api/build/1"));
        assert!(err.is_not_found());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_unreachable_has_no_status() {
        let err = ClientError::unreachable("/api/builders", "connection refused");
        assert_eq!(err.status(), None);
        assert_eq!(err.endpoint(), Some("/api/builders"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_bad_gateway_is_server_error() {
        let err = ClientError::api_error(502, "/api/builders", "");
        assert!(err.is_server_error());
        assert_eq!(err.body(), Some(""));
    }
}
