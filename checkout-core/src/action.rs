//! Backend-issued actions and the details produced by handling them.
//!
//! Actions arrive as JSON discriminated by a `type` string. Known types map to
//! a typed variant; anything else is kept as [`Action::Unknown`] so that the
//! dispatcher, not the parser, decides that nothing can handle it.

use serde::de::{self, Deserializer};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{CheckoutError, Result};

/// Amount in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub currency: String,
    pub value: i64,
}

/// Poll the backend until the shopper finishes the payment elsewhere.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwaitAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
}

/// Show a QR code (or redirect for non-viewable methods) and poll.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// First phase of the two-phase 3DS2 flow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDS2FingerprintAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Second phase of the two-phase 3DS2 flow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreeDS2ChallengeAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surcharge: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions_url: Option<String>,
}

/// Hand-off to a native wallet SDK. `sdk_data` is kept raw and decoded by
/// the handler that understands the wallet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_data: Option<Value>,
}

/// WeChat Pay request parameters carried in [`SdkAction::sdk_data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeChatPaySdkData {
    pub appid: String,
    pub noncestr: String,
    #[serde(rename = "package")]
    pub package_value: String,
    pub partnerid: String,
    pub prepayid: String,
    pub sign: String,
    pub timestamp: String,
}

impl SdkAction {
    /// Decode the wallet payload as WeChat Pay parameters.
    pub fn wechat_pay_data(&self) -> Result<WeChatPaySdkData> {
        let data = self
            .sdk_data
            .clone()
            .ok_or_else(|| CheckoutError::component("SDK Data is null"))?;
        Ok(serde_json::from_value(data)?)
    }
}

/// An action type this build has no model for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnknownAction {
    pub action_type: String,
    pub payment_method_type: Option<String>,
    pub payment_data: Option<String>,
    pub raw: Value,
}

/// A follow-up step returned by the payment backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Await(AwaitAction),
    QrCode(QrCodeAction),
    Redirect(RedirectAction),
    ThreeDS2Fingerprint(ThreeDS2FingerprintAction),
    ThreeDS2Challenge(ThreeDS2ChallengeAction),
    Voucher(VoucherAction),
    Sdk(SdkAction),
    Unknown(UnknownAction),
}

impl Action {
    pub const AWAIT: &'static str = "await";
    pub const QR_CODE: &'static str = "qrCode";
    pub const REDIRECT: &'static str = "redirect";
    pub const THREEDS2_FINGERPRINT: &'static str = "threeDS2Fingerprint";
    pub const THREEDS2_CHALLENGE: &'static str = "threeDS2Challenge";
    pub const VOUCHER: &'static str = "voucher";
    pub const SDK: &'static str = "sdk";

    /// The wire `type` discriminant.
    pub fn action_type(&self) -> &str {
        match self {
            Self::Await(_) => Self::AWAIT,
            Self::QrCode(_) => Self::QR_CODE,
            Self::Redirect(_) => Self::REDIRECT,
            Self::ThreeDS2Fingerprint(_) => Self::THREEDS2_FINGERPRINT,
            Self::ThreeDS2Challenge(_) => Self::THREEDS2_CHALLENGE,
            Self::Voucher(_) => Self::VOUCHER,
            Self::Sdk(_) => Self::SDK,
            Self::Unknown(unknown) => &unknown.action_type,
        }
    }

    pub fn payment_method_type(&self) -> Option<&str> {
        match self {
            Self::Await(a) => a.payment_method_type.as_deref(),
            Self::QrCode(a) => a.payment_method_type.as_deref(),
            Self::Redirect(a) => a.payment_method_type.as_deref(),
            Self::ThreeDS2Fingerprint(a) => a.payment_method_type.as_deref(),
            Self::ThreeDS2Challenge(a) => a.payment_method_type.as_deref(),
            Self::Voucher(a) => a.payment_method_type.as_deref(),
            Self::Sdk(a) => a.payment_method_type.as_deref(),
            Self::Unknown(a) => a.payment_method_type.as_deref(),
        }
    }

    /// The opaque backend token, round-tripped verbatim.
    pub fn payment_data(&self) -> Option<&str> {
        match self {
            Self::Await(a) => a.payment_data.as_deref(),
            Self::QrCode(a) => a.payment_data.as_deref(),
            Self::Redirect(a) => a.payment_data.as_deref(),
            Self::ThreeDS2Fingerprint(a) => a.payment_data.as_deref(),
            Self::ThreeDS2Challenge(a) => a.payment_data.as_deref(),
            Self::Voucher(a) => a.payment_data.as_deref(),
            Self::Sdk(a) => a.payment_data.as_deref(),
            Self::Unknown(a) => a.payment_data.as_deref(),
        }
    }

    /// True for either phase of the 3DS2 flow.
    pub fn is_three_ds2(&self) -> bool {
        matches!(
            self,
            Self::ThreeDS2Fingerprint(_) | Self::ThreeDS2Challenge(_)
        )
    }

    /// Parse an action from backend JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let action_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| de::Error::missing_field("type"))?
            .to_owned();

        let parsed = match action_type.as_str() {
            Self::AWAIT => serde_json::from_value(value).map(Self::Await),
            Self::QR_CODE => serde_json::from_value(value).map(Self::QrCode),
            Self::REDIRECT => serde_json::from_value(value).map(Self::Redirect),
            Self::THREEDS2_FINGERPRINT => {
                serde_json::from_value(value).map(Self::ThreeDS2Fingerprint)
            }
            Self::THREEDS2_CHALLENGE => serde_json::from_value(value).map(Self::ThreeDS2Challenge),
            Self::VOUCHER => serde_json::from_value(value).map(Self::Voucher),
            Self::SDK => serde_json::from_value(value).map(Self::Sdk),
            _ => {
                let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
                let payment_method_type = text("paymentMethodType");
                let payment_data = text("paymentData");
                Ok(Self::Unknown(UnknownAction {
                    action_type,
                    payment_method_type,
                    payment_data,
                    raw: value,
                }))
            }
        };
        parsed.map_err(de::Error::custom)
    }
}

impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let body = match self {
            Self::Await(a) => serde_json::to_value(a),
            Self::QrCode(a) => serde_json::to_value(a),
            Self::Redirect(a) => serde_json::to_value(a),
            Self::ThreeDS2Fingerprint(a) => serde_json::to_value(a),
            Self::ThreeDS2Challenge(a) => serde_json::to_value(a),
            Self::Voucher(a) => serde_json::to_value(a),
            Self::Sdk(a) => serde_json::to_value(a),
            Self::Unknown(a) => Ok(a.raw.clone()),
        }
        .map_err(ser::Error::custom)?;

        let mut object = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        object.insert("type".into(), Value::String(self.action_type().to_owned()));
        object.serialize(serializer)
    }
}

/// Details to resubmit to the backend once a handler completes its flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionComponentData {
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<String>,
}

impl ActionComponentData {
    pub fn new(details: Value, payment_data: Option<String>) -> Self {
        Self {
            details,
            payment_data,
        }
    }

    /// Look up a string entry in the details payload.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_actions() {
        let action = Action::from_json(
            r#"{"type":"qrCode","paymentMethodType":"pix","paymentData":"pd","qrCodeData":"00020126"}"#,
        )
        .unwrap();

        assert_eq!(action.action_type(), "qrCode");
        assert_eq!(action.payment_method_type(), Some("pix"));
        assert_eq!(action.payment_data(), Some("pd"));
        match action {
            Action::QrCode(qr) => assert_eq!(qr.qr_code_data.as_deref(), Some("00020126")),
            other => panic!("unexpected action {other:?}"),
        }

        let action =
            Action::from_json(r#"{"type":"threeDS2Challenge","token":"abc","paymentData":"pd"}"#)
                .unwrap();
        assert!(action.is_three_ds2());
    }

    #[test]
    fn test_unknown_action_type_is_preserved() {
        let action =
            Action::from_json(r#"{"type":"bankTransfer","paymentMethodType":"bt","paymentData":"x"}"#)
                .unwrap();

        assert!(matches!(action, Action::Unknown(_)));
        assert_eq!(action.action_type(), "bankTransfer");
        assert_eq!(action.payment_data(), Some("x"));
    }

    #[test]
    fn test_missing_type_is_rejected() {
        assert!(Action::from_json(r#"{"paymentData":"x"}"#).is_err());
    }

    #[test]
    fn test_serialize_writes_type_discriminant() {
        let action = Action::Await(AwaitAction {
            payment_method_type: Some("mbway".into()),
            payment_data: Some("pd".into()),
        });

        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(
            value,
            json!({"type": "await", "paymentMethodType": "mbway", "paymentData": "pd"})
        );
    }

    #[test]
    fn test_wechat_pay_data() {
        let action = SdkAction {
            payment_method_type: Some("wechatpaySDK".into()),
            payment_data: None,
            sdk_data: Some(json!({
                "appid": "wx1", "noncestr": "n", "package": "Sign=WXPay",
                "partnerid": "p", "prepayid": "pp", "sign": "s", "timestamp": "1"
            })),
        };
        let data = action.wechat_pay_data().unwrap();
        assert_eq!(data.package_value, "Sign=WXPay");

        let empty = SdkAction::default();
        assert_eq!(
            empty.wechat_pay_data().unwrap_err(),
            CheckoutError::component("SDK Data is null")
        );
    }
}
