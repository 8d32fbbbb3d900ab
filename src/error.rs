//! Error types for the payment lifecycle library

use serde_json::Value;
use thiserror::Error;

/// Result type alias for payment operations
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Main error type for payment operations
///
/// A declined charge is not an error: settlement failures come back as a
/// [`PaymentRecord`](crate::PaymentRecord) with status `FAILED`.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// A required field is missing or a value breaks a record invariant
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A status change that the lifecycle does not allow
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// The server refused the payment (400 or 422)
    #[error("Payment rejected by server with status {status}: {body}")]
    Rejected { status: u16, body: Value },

    /// Any other non-2xx response
    #[error("Unexpected response status {status}: {body}")]
    Status { status: u16, body: Value },

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Timeout error
    #[error("Request timeout")]
    Timeout,

    /// The transport abandoned the request before a response arrived
    #[error("Request cancelled")]
    Cancelled,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PaymentError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Map a non-2xx response to the matching variant
    pub fn from_status(status: u16, body: Value) -> Self {
        match status {
            400 | 422 => Self::Rejected { status, body },
            _ => Self::Status { status, body },
        }
    }

    /// Local or server-side validation failure
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::InvalidTransition { .. } | Self::Rejected { .. }
        )
    }

    /// Network failure, timeout, undecodable body or unexpected status
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Status { .. } | Self::Http(_) | Self::Timeout | Self::Json(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status reported by the server, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Error body sent by the server, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Rejected { body, .. } | Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}
