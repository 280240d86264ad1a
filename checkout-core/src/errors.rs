//! Error types for checkout action handling.
//!
//! Every failure that crosses a component boundary is a [`CheckoutError`].
//! The enum is `Clone + PartialEq` so errors can be delivered through the
//! exception streams and compared in tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CheckoutErrorCode {
    /// Feature not available in this build
    Unimplemented = 1000,
    /// Transport/network layer error
    Transport = 2000,
    /// Backend answered with a non-success HTTP status
    Http = 2001,
    /// Generic checkout failure (also used for dispatch misses)
    Checkout = 3000,
    /// Failure inside an action handler
    Component = 3001,
    /// Flow cancelled by the shopper or the host
    Cancellation = 3002,
    /// Runtime permission denied
    PermissionRequest = 3003,
    /// Invalid input provided by the caller
    InvalidInput = 5000,
    /// Serialization error
    Serialization = 5002,
}

/// Error body returned by the payment backend on non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponseBody {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

/// Comprehensive error type for checkout operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckoutError {
    /// Generic checkout failure.
    #[error("{0}")]
    Checkout(String),

    /// Failure reported by an action handler, optionally wrapping a cause.
    #[error("{message}")]
    Component {
        message: String,
        #[source]
        cause: Option<Box<CheckoutError>>,
    },

    /// Backend returned an HTTP error.
    #[error("{code} {message}")]
    Http {
        code: u16,
        message: String,
        error_body: Option<ErrorResponseBody>,
    },

    /// Transport/network layer error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The flow was cancelled.
    #[error("{0}")]
    Cancellation(String),

    /// A runtime permission was not granted.
    #[error("{0}")]
    PermissionRequest(String),

    /// Invalid input provided by the caller.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Feature not compiled into this build.
    #[error("{0} is not implemented in this build")]
    Unimplemented(&'static str),
}

impl CheckoutError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> CheckoutErrorCode {
        match self {
            Self::Checkout(_) => CheckoutErrorCode::Checkout,
            Self::Component { .. } => CheckoutErrorCode::Component,
            Self::Http { .. } => CheckoutErrorCode::Http,
            Self::Transport(_) => CheckoutErrorCode::Transport,
            Self::Serialization(_) => CheckoutErrorCode::Serialization,
            Self::Cancellation(_) => CheckoutErrorCode::Cancellation,
            Self::PermissionRequest(_) => CheckoutErrorCode::PermissionRequest,
            Self::InvalidInput { .. } => CheckoutErrorCode::InvalidInput,
            Self::Unimplemented(_) => CheckoutErrorCode::Unimplemented,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if this error is potentially recoverable by retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { code, .. } => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    /// Create a component error without a cause.
    pub fn component(message: impl Into<String>) -> Self {
        Self::Component {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a component error wrapping another error.
    pub fn component_with_cause(message: impl Into<String>, cause: CheckoutError) -> Self {
        Self::Component {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Create a generic checkout error.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout(message.into())
    }

    /// Create a transport error from any error type.
    pub fn transport<E: std::error::Error>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    /// Create an invalid input error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for CheckoutError {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_input("url", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_codes() {
        let err = CheckoutError::Transport("connection reset".into());
        assert_eq!(err.code(), CheckoutErrorCode::Transport);
        assert!(err.is_retryable());

        let err = CheckoutError::component("Unsupported action");
        assert_eq!(err.code(), CheckoutErrorCode::Component);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_http_error_display() {
        let err = CheckoutError::Http {
            code: 422,
            message: "Unprocessable Entity".into(),
            error_body: None,
        };
        assert_eq!(err.to_string(), "422 Unprocessable Entity");
        assert!(!err.is_retryable());

        let err = CheckoutError::Http {
            code: 503,
            message: "Service Unavailable".into(),
            error_body: None,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn test_component_error_keeps_cause() {
        let cause = CheckoutError::Transport("timeout".into());
        let err = CheckoutError::component_with_cause("Error while polling status", cause.clone());

        assert_eq!(err.to_string(), "Error while polling status");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source, Some(cause.to_string()));
    }
}
