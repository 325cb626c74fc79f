//! Error types for the activity domain.

use thiserror::Error;

/// Result type for activity backend operations.
pub type ActivityResult<T> = Result<T, ActivityError>;

/// Errors that can occur while talking to the activity backend.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// No token and no credentials: reporting is off for this process.
    #[error("Activity reporting disabled: {0}")]
    Disabled(String),

    /// Configuration error (missing credentials for a re-login, bad URL, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The login exchange did not yield a token.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The backend rejected the token again after a fresh login.
    #[error("Authorization rejected after re-authentication")]
    Unauthorized,

    /// The logical job identifier has no matching job type.
    #[error("Job type '{0}' not found")]
    JobTypeNotFound(String),

    /// Non-success HTTP status from the backend.
    #[error("Activity API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The backend answered with a body we could not understand.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ActivityError {
    /// Configuration problems are never retried with a re-login.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ActivityError::Disabled(_) | ActivityError::Config(_) | ActivityError::JobTypeNotFound(_)
        )
    }
}

impl From<reqwest::Error> for ActivityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ActivityError::InvalidResponse(err.to_string())
        } else {
            ActivityError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ActivityError {
    fn from(err: serde_json::Error) -> Self {
        ActivityError::InvalidResponse(format!("JSON error: {}", err))
    }
}
