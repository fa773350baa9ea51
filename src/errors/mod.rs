//! Error types for the bookwatch client.
//!
//! Covers the failure modes of the optimistic mutation protocol: rejected
//! user input, transport failures, and unexpected responses from the card
//! store.

use thiserror::Error;

/// Result type alias for bookwatch operations.
pub type BookwatchResult<T> = Result<T, BookwatchError>;

/// Error type for bookwatch client operations.
#[derive(Debug, Error)]
pub enum BookwatchError {
    /// Configuration error (invalid base URL, poll interval, etc.)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue.
        message: String,
    },

    /// User input is missing a required field.
    #[error("Validation error: {message}")]
    Validation {
        /// Error message describing the validation issue.
        message: String,
        /// The field that failed validation.
        field: Option<String>,
    },

    /// The card has not been acknowledged by the server yet.
    #[error("Card is pending and cannot be removed until the server assigns an id")]
    PendingCard,

    /// The card store answered with a non-success status or an unusable body.
    #[error("Server error (HTTP {status_code}): {message}")]
    Server {
        /// Error message.
        message: String,
        /// HTTP status code.
        status_code: u16,
    },

    /// Network/connection error.
    #[error("Network error: {message}")]
    Network {
        /// Error message.
        message: String,
    },

    /// Timeout error.
    #[error("Request timeout: {message}")]
    Timeout {
        /// Error message.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },
}

impl BookwatchError {
    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookwatchError::Server {
                status_code: 500..=504,
                ..
            } | BookwatchError::Timeout { .. }
                | BookwatchError::Network { .. }
        )
    }

    /// Creates a validation error for a named field.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        BookwatchError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a server error.
    pub fn server(status_code: u16, message: impl Into<String>) -> Self {
        BookwatchError::Server {
            message: message.into(),
            status_code,
        }
    }
}

impl From<serde_json::Error> for BookwatchError {
    fn from(err: serde_json::Error) -> Self {
        BookwatchError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for BookwatchError {
    fn from(err: url::ParseError) -> Self {
        BookwatchError::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}
