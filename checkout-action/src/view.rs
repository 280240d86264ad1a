//! View types published by handlers so the host knows what to render.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QrCodeViewType {
    /// Countdown and status only.
    Simple,
    /// QR image, amount, countdown and save-image button.
    Full,
    /// The QR flow continues in another app.
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherViewType {
    Simple,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "view", content = "variant", rename_all = "snake_case")]
pub enum ComponentViewType {
    Await,
    QrCode(QrCodeViewType),
    Redirect,
    ThreeDS2,
    Voucher(VoucherViewType),
    WeChatPay,
}
