//! Checkout Action Handling
//!
//! Handlers for every action the payment backend can return after a payment
//! request, and the [`GenericActionDelegate`] that routes actions to them.
//!
//! | Action                | Handler                   |
//! |-----------------------|---------------------------|
//! | `await`               | [`AwaitHandler`]          |
//! | `qrCode`              | [`QrCodeHandler`]         |
//! | `redirect`            | [`RedirectActionHandler`] |
//! | `threeDS2Fingerprint` | [`ThreeDS2Handler`]       |
//! | `threeDS2Challenge`   | [`ThreeDS2Handler`]       |
//! | `voucher`             | [`VoucherHandler`]        |
//! | `sdk` (WeChat Pay)    | [`WeChatPayHandler`]      |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use checkout_action::{DefaultHandlerDependencies, GenericActionDelegate};
//! use checkout_core::{Action, CheckoutConfiguration, ComponentScope, Environment};
//! use checkout_core::saved_state::SavedState;
//!
//! let configuration = Arc::new(CheckoutConfiguration::new(Environment::Test, "test_KEY"));
//! let dependencies = DefaultHandlerDependencies::with_image_directory(status_service, "/tmp");
//! let delegate = Arc::new(GenericActionDelegate::new(
//!     configuration,
//!     SavedState::new(),
//!     Arc::new(dependencies),
//! ));
//!
//! delegate.initialize(ComponentScope::current()?);
//! delegate.handle_action(Action::from_json(&action_json)?, activity)?;
//!
//! while let Some(details) = delegate.details().recv().await {
//!     submit_details(details).await?;
//! }
//! ```

pub mod await_action;
pub mod delegate;
pub mod dispatcher;
pub mod handler;
pub mod observer;
mod polling;
pub mod qr_code;
pub mod redirect_action;
pub mod three_ds2;
pub mod view;
pub mod voucher;
pub mod wechat;

pub use await_action::{AwaitHandler, AwaitOutputData};
pub use delegate::GenericActionDelegate;
pub use dispatcher::{ActionDispatcher, DefaultHandlerDependencies, HandlerDependencies, Resolution};
pub use handler::{
    ActionHandler, Capabilities, HandlerKind, HandlerOutputs, HandlerState, IntentHandling,
    Redirectable, ResolvedHandler, StatusPolling,
};
pub use observer::{ActionCallback, ActionComponentEvent, ActionObserverRepository};
pub use polling::PAYLOAD_DETAILS_KEY;
pub use qr_code::{QrCodeHandler, QrCodeOutputData, QrCodeUiEvent, QrImageDownloadResult};
pub use redirect_action::RedirectActionHandler;
pub use three_ds2::{ThreeDS2Handler, ThreeDS2Service, ThreeDS2Transaction};
pub use view::{ComponentViewType, QrCodeViewType, VoucherViewType};
pub use voucher::{VoucherHandler, VoucherOutputData};
pub use wechat::{WeChatPayApi, WeChatPayHandler, WeChatPayResponse};
