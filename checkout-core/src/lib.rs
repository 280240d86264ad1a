//! Checkout core.
//!
//! Building blocks shared by every action handler: the action model, the
//! status polling protocol, redirect handling, and the stream and scope
//! primitives handlers use to talk to the action delegate.
//!
//! Platform concerns (opening a browser, asking for permissions, persisting
//! state across process death) are reached through small traits the host
//! implements.
//!
//! # Example
//!
//! ```ignore
//! use checkout_core::status::{DefaultStatusRepository, HttpStatusService, StatusRepository};
//! use checkout_core::config::{CheckoutConfiguration, Environment};
//! use futures::StreamExt;
//!
//! let config = CheckoutConfiguration::new(Environment::Test, "test_CLIENTKEY");
//! let service = Arc::new(HttpStatusService::new(&config)?);
//! let repository = DefaultStatusRepository::new(service);
//!
//! let mut ticks = repository.poll(payment_data, config.polling.default_max_duration());
//! while let Some(result) = ticks.next().await {
//!     println!("{:?}", result);
//! }
//! ```

pub mod action;
pub mod analytics;
pub mod channel;
pub mod config;
pub mod errors;
pub mod image;
pub mod lifecycle;
pub mod payment_method;
pub mod permission;
pub mod redirect;
pub mod saved_state;
pub mod scope;
pub mod status;

/// Test doubles for handler and delegate tests.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use action::{Action, ActionComponentData};
pub use channel::{BufferedChannel, StateFlow};
pub use config::{CheckoutConfiguration, Environment};
pub use errors::{CheckoutError, CheckoutErrorCode};
pub use redirect::{Activity, ActivityHandle, Intent, RedirectHandler, RedirectListener};
pub use scope::{ComponentScope, Job};
pub use status::{StatusRepository, StatusResponse, StatusService};

/// Common result alias for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
