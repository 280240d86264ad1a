//! Payment method type identifiers referenced by the action handlers.

pub const DUIT_NOW: &str = "duitnow";
pub const PIX: &str = "pix";
pub const PAY_NOW: &str = "paynow";
pub const PROMPT_PAY: &str = "promptpay";
pub const UPI_QR: &str = "upi_qr";
pub const WECHAT_PAY_SDK: &str = "wechatpaySDK";
pub const BOLETO: &str = "boletobancario";
pub const BOLETO_SANTANDER: &str = "boletobancario_santander";
pub const MULTIBANCO: &str = "multibanco";
pub const OXXO: &str = "oxxo";
pub const ECONTEXT_ATM: &str = "econtext_atm";
pub const ECONTEXT_ONLINE: &str = "econtext_online";
pub const ECONTEXT_SEVEN_ELEVEN: &str = "econtext_seven_eleven";
pub const ECONTEXT_STORES: &str = "econtext_stores";
