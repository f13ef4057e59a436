//! Error classification
//!
//! Decides, for any failed request, whether the user should hear about it.
//! Every poller and every mutating operation goes through the same rules.

use carpentry_client::ClientError;
use serde::Deserialize;

/// What to do about a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    Silent,
    Notify,
    Redirect,
}

/// Outcome of classifying one failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Transient infrastructure trouble; log it and retry on the next tick
    Silent,
    /// Application error worth showing to the user
    Notify { message: String },
    /// The session is no longer authenticated
    Redirect { to: String },
}

impl Classification {
    pub fn action(&self) -> ErrorAction {
        match self {
            Classification::Silent => ErrorAction::Silent,
            Classification::Notify { .. } => ErrorAction::Notify,
            Classification::Redirect { .. } => ErrorAction::Redirect,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Classification::Notify { message } => Some(message),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Classification::Redirect { .. })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Maps HTTP outcomes to actions
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    login_route: String,
}

impl ErrorClassifier {
    pub fn new(login_route: impl Into<String>) -> Self {
        Self {
            login_route: login_route.into(),
        }
    }

    /// View shown to unauthenticated users
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Classify a raw HTTP outcome
    ///
    /// `status` is `None` when the request never reached the server.
    pub fn classify(&self, endpoint: &str, status: Option<u16>, body: Option<&str>) -> Classification {
        match status {
            None => Classification::Silent,
            Some(401) => Classification::Redirect {
                to: self.login_route.clone(),
            },
            // the reverse proxy answers 502 while the backend is still booting
            Some(502) => Classification::Silent,
            Some(status) => Classification::Notify {
                message: notify_message(endpoint, status, body),
            },
        }
    }

    /// Classify a client failure with the same rules
    pub fn classify_error(&self, err: &ClientError) -> Classification {
        match err {
            ClientError::ParseError { endpoint, .. } => Classification::Notify {
                message: format!("{} returned a response that could not be read", endpoint),
            },
            ClientError::InvalidRequest(message) => Classification::Notify {
                message: message.clone(),
            },
            _ => self.classify(err.endpoint().unwrap_or("request"), err.status(), err.body()),
        }
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new("/splash")
    }
}

fn notify_message(endpoint: &str, status: u16, body: Option<&str>) -> String {
    let server_error = body
        .and_then(|b| serde_json::from_str::<ErrorBody>(b).ok())
        .and_then(|b| b.error)
        .filter(|e| !e.is_empty());

    match server_error {
        Some(error) => format!("ERROR: {}", error),
        None => format!("{} failed with status {}", endpoint, status),
    }
}
