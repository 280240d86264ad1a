//! Callback interfaces implemented by the host app, and the bridges that
//! adapt them to the checkout traits.
//!
//! ```text
//!   Swift/Kotlin                     Rust
//!   UriLauncher          ──────▶  UriLauncherBridge  (checkout_core::Activity)
//!   WeChatPayApiFFI      ──────▶  WeChatPayBridge    (checkout_action::WeChatPayApi)
//!   ActionEventListener  ◀──────  CheckoutActionComponent event delivery
//! ```
//!
//! # Thread Safety
//!
//! All methods may be called from any thread. Implementations must be
//! thread-safe.

use std::collections::HashMap;
use std::sync::Arc;

use checkout_action::{ComponentViewType, QrCodeViewType, VoucherViewType, WeChatPayApi, WeChatPayResponse};
use checkout_core::action::WeChatPaySdkData;
use checkout_core::{Activity, ActionComponentData, CheckoutError, Intent};
use url::Url;

use crate::CheckoutMobileError;

// ============================================================================
// Records
// ============================================================================

/// Details to submit to the backend's payment details endpoint.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct ActionDetailsFFI {
    /// JSON object for the `details` field.
    pub details_json: String,
    pub payment_data: Option<String>,
}

impl From<ActionComponentData> for ActionDetailsFFI {
    fn from(data: ActionComponentData) -> Self {
        Self {
            details_json: data.details.to_string(),
            payment_data: data.payment_data,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct ActionErrorFFI {
    /// Stable numeric code (see `CheckoutErrorCode`).
    pub code: i32,
    pub message: String,
}

impl From<&CheckoutError> for ActionErrorFFI {
    fn from(error: &CheckoutError) -> Self {
        Self {
            code: error.code() as i32,
            message: error.message(),
        }
    }
}

/// Which screen the host should show for the current action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum ViewTypeFFI {
    Await,
    QrCodeSimple,
    QrCodeFull,
    QrCodeRedirect,
    Redirect,
    ThreeDS2,
    VoucherSimple,
    VoucherFull,
    WeChatPay,
}

impl From<ComponentViewType> for ViewTypeFFI {
    fn from(view: ComponentViewType) -> Self {
        match view {
            ComponentViewType::Await => Self::Await,
            ComponentViewType::QrCode(QrCodeViewType::Simple) => Self::QrCodeSimple,
            ComponentViewType::QrCode(QrCodeViewType::Full) => Self::QrCodeFull,
            ComponentViewType::QrCode(QrCodeViewType::Redirect) => Self::QrCodeRedirect,
            ComponentViewType::Redirect => Self::Redirect,
            ComponentViewType::ThreeDS2 => Self::ThreeDS2,
            ComponentViewType::Voucher(VoucherViewType::Simple) => Self::VoucherSimple,
            ComponentViewType::Voucher(VoucherViewType::Full) => Self::VoucherFull,
            ComponentViewType::WeChatPay => Self::WeChatPay,
        }
    }
}

/// Parameters for the WeChat Open SDK `PayReq`.
#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct WeChatPayRequestFFI {
    pub app_id: String,
    pub partner_id: String,
    pub prepay_id: String,
    pub package_value: String,
    pub nonce_str: String,
    pub time_stamp: String,
    pub sign: String,
}

impl From<&WeChatPaySdkData> for WeChatPayRequestFFI {
    fn from(data: &WeChatPaySdkData) -> Self {
        Self {
            app_id: data.appid.clone(),
            partner_id: data.partnerid.clone(),
            prepay_id: data.prepayid.clone(),
            package_value: data.package_value.clone(),
            nonce_str: data.noncestr.clone(),
            time_stamp: data.timestamp.clone(),
            sign: data.sign.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct WeChatPayResultFFI {
    pub err_code: i32,
    pub err_str: Option<String>,
}

// ============================================================================
// Callback Interfaces
// ============================================================================

/// Opens URIs outside the app.
#[uniffi::export(callback_interface)]
pub trait UriLauncher: Send + Sync {
    /// Open `uri`. Return an error when no app on the device can handle it.
    fn open_uri(&self, uri: String) -> Result<(), CheckoutMobileError>;
}

/// Receives everything the action component produces.
#[uniffi::export(callback_interface)]
pub trait ActionEventListener: Send + Sync {
    /// The action finished; submit these details to the backend.
    fn on_action_details(&self, details: ActionDetailsFFI);

    fn on_error(&self, error: ActionErrorFFI);

    /// Ask the user for `permission`, then call
    /// `CheckoutActionComponent::resolve_permission(request_id, granted)`.
    fn on_permission_request(&self, request_id: u64, permission: String);

    fn on_view_type_changed(&self, view_type: Option<ViewTypeFFI>);
}

/// Bridge to the WeChat Open SDK.
#[uniffi::export(callback_interface)]
pub trait WeChatPayApiFFI: Send + Sync {
    fn is_app_installed(&self) -> bool;

    /// Hand the request to the WeChat app; false if it refused.
    fn send_pay_request(&self, request: WeChatPayRequestFFI) -> bool;

    /// Extract the payment result from the intent returning from WeChat.
    fn parse_result(
        &self,
        uri: Option<String>,
        extras: HashMap<String, String>,
    ) -> Option<WeChatPayResultFFI>;
}

// ============================================================================
// Bridges
// ============================================================================

/// [`Activity`] backed by the host's [`UriLauncher`].
pub struct UriLauncherBridge {
    ffi: Arc<dyn UriLauncher>,
}

impl UriLauncherBridge {
    pub fn new(ffi: Arc<dyn UriLauncher>) -> Self {
        Self { ffi }
    }
}

impl std::fmt::Debug for UriLauncherBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UriLauncherBridge")
            .field("ffi", &"<UriLauncher>")
            .finish()
    }
}

impl Activity for UriLauncherBridge {
    fn open_uri(&self, uri: &Url) -> checkout_core::Result<()> {
        self.ffi
            .open_uri(uri.to_string())
            .map_err(|e| CheckoutError::checkout(e.to_string()))
    }
}

/// [`WeChatPayApi`] backed by the host's [`WeChatPayApiFFI`].
pub struct WeChatPayBridge {
    ffi: Arc<dyn WeChatPayApiFFI>,
}

impl WeChatPayBridge {
    pub fn new(ffi: Arc<dyn WeChatPayApiFFI>) -> Self {
        Self { ffi }
    }
}

impl WeChatPayApi for WeChatPayBridge {
    fn is_app_installed(&self) -> bool {
        self.ffi.is_app_installed()
    }

    fn send_pay_request(&self, request: &WeChatPaySdkData) -> bool {
        self.ffi.send_pay_request(request.into())
    }

    fn parse_intent(&self, intent: &Intent) -> Option<WeChatPayResponse> {
        self.ffi
            .parse_result(
                intent.data.as_ref().map(Url::to_string),
                intent.extras.clone(),
            )
            .map(|result| WeChatPayResponse {
                err_code: result.err_code,
                err_str: result.err_str,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingLauncher {
        opened: Mutex<Vec<String>>,
        fail: bool,
    }

    impl UriLauncher for RecordingLauncher {
        fn open_uri(&self, uri: String) -> Result<(), CheckoutMobileError> {
            if self.fail {
                return Err(CheckoutMobileError::NotFound {
                    msg: "no browser".into(),
                });
            }
            self.opened.lock().unwrap().push(uri);
            Ok(())
        }
    }

    #[test]
    fn test_launcher_bridge() {
        let launcher = Arc::new(RecordingLauncher {
            opened: Mutex::new(Vec::new()),
            fail: false,
        });
        let bridge = UriLauncherBridge::new(launcher.clone());

        bridge
            .open_uri(&Url::parse("https://bank.example/auth").unwrap())
            .unwrap();
        assert_eq!(
            *launcher.opened.lock().unwrap(),
            vec!["https://bank.example/auth".to_string()]
        );

        let failing = UriLauncherBridge::new(Arc::new(RecordingLauncher {
            opened: Mutex::new(Vec::new()),
            fail: true,
        }));
        let err = failing
            .open_uri(&Url::parse("https://bank.example").unwrap())
            .unwrap_err();
        assert_eq!(err.message(), "Not found: no browser");
    }

    #[test]
    fn test_view_type_mapping() {
        assert_eq!(
            ViewTypeFFI::from(ComponentViewType::QrCode(QrCodeViewType::Full)),
            ViewTypeFFI::QrCodeFull
        );
        assert_eq!(
            ViewTypeFFI::from(ComponentViewType::Voucher(VoucherViewType::Simple)),
            ViewTypeFFI::VoucherSimple
        );
    }

    #[test]
    fn test_error_record_keeps_code() {
        let record = ActionErrorFFI::from(&CheckoutError::component("Payment data is null"));
        assert_eq!(record.code, 3001);
        assert_eq!(record.message, "Payment data is null");
    }
}
