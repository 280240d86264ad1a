//! Checkout Mobile FFI Bindings
//!
//! UniFFI bindings exposing checkout action handling to iOS (Swift) and
//! Android (Kotlin) hosts.
//!
//! # Architecture
//!
//! The host creates one [`CheckoutActionComponent`] per payment screen and
//! implements three callback interfaces:
//! - [`UriLauncher`]: opens redirect URLs in a browser or banking app
//! - [`ActionEventListener`]: receives details, errors, permission requests
//!   and view type changes
//! - [`WeChatPayApiFFI`]: optional bridge to the WeChat Open SDK
//!
//! # Thread Safety
//!
//! All exposed types are thread-safe and can be used from any thread.
//! Polling and other background work run on a Tokio runtime owned by the
//! component; listener callbacks arrive on its worker threads.

pub mod async_bridge;
pub mod callbacks;
pub mod component;

pub use callbacks::{
    ActionDetailsFFI, ActionErrorFFI, ActionEventListener, UriLauncher, ViewTypeFFI,
    WeChatPayApiFFI, WeChatPayRequestFFI, WeChatPayResultFFI,
};
pub use component::CheckoutActionComponent;

use checkout_core::CheckoutError;

// UniFFI scaffolding
uniffi::setup_scaffolding!();

// ============================================================================
// Error Types
// ============================================================================

/// Mobile-friendly error type.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CheckoutMobileError {
    /// Generic checkout failure, including actions no handler supports.
    #[error("Checkout error: {msg}")]
    Checkout { msg: String },

    /// Failure inside an action handler.
    #[error("Component error: {msg}")]
    Component { msg: String },

    /// Backend answered with a non-success HTTP status.
    #[error("HTTP error {code}: {msg}")]
    Http { code: u16, msg: String },

    /// Transport layer error (network, I/O).
    #[error("Transport error: {msg}")]
    Transport { msg: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {msg}")]
    Serialization { msg: String },

    /// Flow cancelled by the shopper or the host.
    #[error("Cancelled: {msg}")]
    Cancellation { msg: String },

    /// Permission denied.
    #[error("Permission denied: {msg}")]
    PermissionDenied { msg: String },

    /// Validation error (invalid input, format).
    #[error("Validation error: {msg}")]
    Validation { msg: String },

    /// Resource not found.
    #[error("Not found: {msg}")]
    NotFound { msg: String },

    /// Internal error (unexpected state).
    #[error("Internal error: {msg}")]
    Internal { msg: String },
}

impl From<CheckoutError> for CheckoutMobileError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::Checkout(msg) => Self::Checkout { msg },
            CheckoutError::Component { message, .. } => Self::Component { msg: message },
            CheckoutError::Http { code, message, .. } => Self::Http { code, msg: message },
            CheckoutError::Transport(msg) => Self::Transport { msg },
            CheckoutError::Serialization(msg) => Self::Serialization { msg },
            CheckoutError::Cancellation(msg) => Self::Cancellation { msg },
            CheckoutError::PermissionRequest(msg) => Self::PermissionDenied { msg },
            CheckoutError::InvalidInput { field, reason } => Self::Validation {
                msg: format!("Invalid {}: {}", field, reason),
            },
            CheckoutError::Unimplemented(feature) => Self::Internal {
                msg: format!("{} is not implemented in this build", feature),
            },
        }
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for CheckoutMobileError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Internal { msg: e.reason }
    }
}

pub type Result<T> = std::result::Result<T, CheckoutMobileError>;

// ============================================================================
// Utility Functions
// ============================================================================

/// Get the library version.
#[uniffi::export]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Normalize a returning deep link into the details JSON the backend expects.
#[uniffi::export]
pub fn parse_redirect_result(uri: String) -> Result<String> {
    use checkout_core::redirect::DefaultRedirectHandler;
    use checkout_core::RedirectHandler;

    let url = url::Url::parse(&uri).map_err(CheckoutError::from)?;
    let details = DefaultRedirectHandler::new().parse_redirect_result(Some(&url))?;
    Ok(details.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err: CheckoutMobileError = CheckoutError::Http {
            code: 401,
            message: "Unauthorized".into(),
            error_body: None,
        }
        .into();
        assert!(matches!(err, CheckoutMobileError::Http { code: 401, .. }));

        let err: CheckoutMobileError = CheckoutError::component_with_cause(
            "Error while polling status",
            CheckoutError::Transport("reset".into()),
        )
        .into();
        assert_eq!(
            err.to_string(),
            "Component error: Error while polling status"
        );

        let err: CheckoutMobileError = CheckoutError::invalid_input("url", "empty").into();
        assert!(matches!(err, CheckoutMobileError::Validation { .. }));
    }

    #[test]
    fn test_parse_redirect_result() {
        let details =
            parse_redirect_result("myapp://checkout?redirectResult=abc%3D".to_string()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&details).unwrap();
        assert_eq!(value["redirectResult"], "abc=");

        assert!(parse_redirect_result("myapp://checkout".to_string()).is_err());
        assert!(parse_redirect_result("not a uri".to_string()).is_err());
    }

    #[test]
    fn test_version() {
        assert!(!get_version().is_empty());
    }
}
