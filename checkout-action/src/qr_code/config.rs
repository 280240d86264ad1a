//! Per payment method presentation of QR code actions.

use std::time::Duration;

use checkout_core::payment_method;

use crate::view::QrCodeViewType;

/// View type and polling window for one QR payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrCodePaymentMethodConfig {
    pub view_type: QrCodeViewType,
    pub max_polling_duration: Duration,
    pub message_key: Option<&'static str>,
}

impl QrCodePaymentMethodConfig {
    const fn new(
        view_type: QrCodeViewType,
        minutes: u64,
        message_key: Option<&'static str>,
    ) -> Self {
        Self {
            view_type,
            max_polling_duration: Duration::from_secs(minutes * 60),
            message_key,
        }
    }

    /// Table entry for the method. Methods without an entry poll for
    /// `default_max_polling_duration`.
    pub fn for_payment_method(
        payment_method_type: Option<&str>,
        default_max_polling_duration: Duration,
    ) -> Self {
        match payment_method_type {
            Some(payment_method::PIX) => {
                Self::new(QrCodeViewType::Simple, 15, Some("checkout_qr_code_pix"))
            }
            Some(payment_method::PAY_NOW) => {
                Self::new(QrCodeViewType::Full, 3, Some("checkout_qr_code_paynow"))
            }
            Some(payment_method::PROMPT_PAY) => {
                Self::new(QrCodeViewType::Full, 15, Some("checkout_qr_code_promptpay"))
            }
            Some(payment_method::DUIT_NOW) => {
                Self::new(QrCodeViewType::Full, 15, Some("checkout_qr_code_duitnow"))
            }
            Some(payment_method::UPI_QR) => {
                Self::new(QrCodeViewType::Full, 5, Some("checkout_qr_code_upi"))
            }
            _ => Self {
                view_type: QrCodeViewType::Simple,
                max_polling_duration: default_max_polling_duration,
                message_key: None,
            },
        }
    }
}

/// Methods whose QR code is shown in-app; anything else is handed to the
/// issuer through a redirect.
pub fn is_viewable(payment_method_type: Option<&str>) -> bool {
    matches!(
        payment_method_type,
        Some(
            payment_method::PIX
                | payment_method::PAY_NOW
                | payment_method::PROMPT_PAY
                | payment_method::DUIT_NOW
                | payment_method::UPI_QR
        )
    )
}
