//! HTTP transport layer for the bookwatch client.
//!
//! Provides the transport abstraction the card service is written against,
//! and a reqwest-backed implementation.

mod http;

pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, HttpTransportImpl};

use std::time::Duration;

use crate::errors::BookwatchError;

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Timeout error.
    #[error("Timeout after {timeout:?}")]
    Timeout {
        /// Timeout duration.
        timeout: Duration,
    },

    /// Invalid response.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },
}

impl From<TransportError> for BookwatchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout { timeout } => BookwatchError::Timeout {
                message: format!("no response after {:?}", timeout),
            },
            TransportError::Connection { message } | TransportError::InvalidResponse { message } => {
                BookwatchError::Network { message }
            }
        }
    }
}
