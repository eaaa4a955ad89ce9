use thiserror::Error;

use crate::auth::StoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("API endpoint not provided")]
    MissingEndpoint,

    #[error("Access token not found. Please login.")]
    MissingToken,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: token refresh failed. Please login again.")]
    RefreshFailed,

    #[error("Invalid JSON response from API")]
    InvalidJson,

    #[error("Error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Token store error: {0}")]
    Store(#[from] StoreError),
}

/// Fallback used when a failed response carries no `message` field
pub const DEFAULT_FAILURE_MESSAGE: &str = "Request failed.";

/// Maximum length for server-supplied messages in error values
const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a server message to avoid carrying excessive data around
    fn truncate_message(message: &str) -> String {
        if message.len() <= MAX_ERROR_MESSAGE_LENGTH {
            return message.to_string();
        }
        let mut end = MAX_ERROR_MESSAGE_LENGTH;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &message[..end],
            message.len()
        )
    }

    /// Build a status error from a parsed response body.
    pub fn from_status(status: reqwest::StatusCode, body: &serde_json::Value) -> Self {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .filter(|m| !m.is_empty())
            .map(Self::truncate_message)
            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());

        ApiError::Status {
            status: status.as_u16(),
            message,
        }
    }

    /// Errors raised before any network call was attempted.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ApiError::MissingEndpoint
                | ApiError::MissingToken
                | ApiError::InvalidPayload(_)
                | ApiError::InvalidInput(_)
        )
    }

    /// The session is gone and the user has to sign in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiError::RefreshFailed | ApiError::MissingToken | ApiError::Status { status: 401, .. }
        )
    }
}
